use chrono::NaiveDate;

use super::entities::{CardId, MemberId, SessionEntry};

/// Completed sessions of one member on one card, in the order they were completed. Entries are
/// never edited or removed; [SessionLog::append] is the only way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    member_id: MemberId,
    card_id: CardId,
    entries: Vec<SessionEntry>,
}

impl SessionLog {
    pub fn new(member_id: MemberId, card_id: CardId) -> Self {
        Self {
            member_id,
            card_id,
            entries: Vec::new(),
        }
    }

    pub(crate) fn with_entries(
        member_id: MemberId,
        card_id: CardId,
        entries: Vec<SessionEntry>,
    ) -> Self {
        Self {
            member_id,
            card_id,
            entries,
        }
    }

    pub(crate) fn append(&mut self, entry: SessionEntry) {
        debug_assert_eq!(entry.member_id, self.member_id);
        debug_assert_eq!(entry.card_id, self.card_id);
        self.entries.push(entry);
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member_id
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_on(&self, day: NaiveDate) -> impl Iterator<Item = &SessionEntry> {
        self.entries.iter().filter(move |e| e.day == day)
    }

    /// Completed minutes attributed to `day`.
    pub fn minutes_on(&self, day: NaiveDate) -> i64 {
        self.entries_on(day).map(|e| e.duration_minutes).sum()
    }
}
