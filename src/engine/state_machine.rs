//! Clock-in/clock-out transitions for one member on one card.
//!
//! The state is derived from [MemberRecord::active]: [ClockState::Clocked] while a session is
//! open, [ClockState::NotClocked] otherwise. Transitions only touch the in-memory record, the
//! caller is responsible for committing it.

use chrono::{DateTime, TimeZone, Utc};

use crate::utils::time::{floor_minutes, local_date};

use super::{
    entities::{ActiveSession, CardId, MemberId, MemberRecordEntity, SessionEntry, SessionEntryEntity},
    session_log::SessionLog,
};

pub const CLOCK_IN_LABEL: &str = "Clock In";
pub const CLOCK_OUT_LABEL: &str = "Clock Out";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockState {
    NotClocked,
    Clocked(ActiveSession),
}

impl ClockState {
    /// Text of the action the member can take next.
    pub fn label(&self) -> &'static str {
        match self {
            ClockState::NotClocked => CLOCK_IN_LABEL,
            ClockState::Clocked(_) => CLOCK_OUT_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockInOutcome {
    Started(ActiveSession),
    /// Already clocked in; carries the start of the open session.
    AlreadyActive(DateTime<Utc>),
}

/// Everything stored for one member on one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub active: Option<ActiveSession>,
    pub log: SessionLog,
}

impl MemberRecord {
    pub fn new(member_id: MemberId, card_id: CardId) -> Self {
        Self {
            active: None,
            log: SessionLog::new(member_id, card_id),
        }
    }

    pub fn from_entity(member_id: MemberId, card_id: CardId, entity: MemberRecordEntity) -> Self {
        let active = entity.active.map(|start| ActiveSession {
            member_id: member_id.clone(),
            card_id: card_id.clone(),
            start,
        });
        let entries = entity
            .log
            .into_iter()
            .map(|e| SessionEntry::from_entity(member_id.clone(), card_id.clone(), e))
            .collect();
        Self {
            active,
            log: SessionLog::with_entries(member_id, card_id, entries),
        }
    }

    pub fn to_entity(&self) -> MemberRecordEntity {
        MemberRecordEntity {
            active: self.active.as_ref().map(|a| a.start),
            log: self
                .log
                .entries()
                .iter()
                .map(SessionEntryEntity::from)
                .collect(),
        }
    }

    pub fn state(&self) -> ClockState {
        match &self.active {
            Some(active) => ClockState::Clocked(active.clone()),
            None => ClockState::NotClocked,
        }
    }

    pub fn clock_in(&mut self, now: DateTime<Utc>) -> ClockInOutcome {
        if let Some(active) = &self.active {
            return ClockInOutcome::AlreadyActive(active.start);
        }
        let session = ActiveSession {
            member_id: self.log.member_id().clone(),
            card_id: self.log.card_id().clone(),
            start: now,
        };
        self.active = Some(session.clone());
        ClockInOutcome::Started(session)
    }

    /// Closes the open session into a log entry. Returns [None] when nothing was open.
    pub fn clock_out<Tz: TimeZone>(&mut self, now: DateTime<Utc>, tz: &Tz) -> Option<SessionEntry> {
        let active = self.active.take()?;
        let entry = SessionEntry {
            member_id: active.member_id,
            card_id: active.card_id,
            start: active.start,
            end: now,
            duration_minutes: session_minutes(active.start, now),
            day: local_date(active.start, tz),
        };
        self.log.append(entry.clone());
        Some(entry)
    }
}

/// Recorded length of a session: whole minutes rounded down, never less than one.
pub fn session_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    floor_minutes(start, end).max(1)
}
