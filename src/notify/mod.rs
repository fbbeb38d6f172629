//! Best-effort announcements of completed sessions on the card's activity stream.

pub mod outbox;

use async_trait::async_trait;
use chrono::TimeZone;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::{
    engine::entities::{Member, SessionEntry},
    utils::time::{day_key, format_hours_minutes, local_date, local_hhmm},
};

pub const DEFAULT_CHECKLIST_NAME: &str = "Time Entries";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),

    #[error("notification i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("notification payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The host endpoints used to post on a card.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_comment(&self, card_id: &str, text: &str) -> Result<(), NotifyError>;

    /// Returns the id of the card checklist called `name`, creating it if needed.
    async fn ensure_checklist(&self, card_id: &str, name: &str) -> Result<String, NotifyError>;

    async fn add_checklist_item(&self, checklist_id: &str, text: &str) -> Result<(), NotifyError>;
}

/// Posts a comment and a checklist line for every completed session.
pub struct NotificationDispatcher<N> {
    notifier: N,
    checklist_name: String,
}

impl<N: Notifier> NotificationDispatcher<N> {
    pub fn new(notifier: N, checklist_name: impl Into<String>) -> Self {
        Self {
            notifier,
            checklist_name: checklist_name.into(),
        }
    }

    /// Stops at the first failing call. Nothing is retried.
    pub async fn announce<Tz: TimeZone>(
        &self,
        member: &Member,
        entry: &SessionEntry,
        tz: &Tz,
    ) -> Result<(), NotifyError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let card_id = entry.card_id.as_str();
        self.notifier
            .post_comment(card_id, &comment_text(member, entry, tz))
            .await
            .inspect_err(|e| warn!("Failed to post comment on {card_id}: {e}"))?;

        let checklist_id = self
            .notifier
            .ensure_checklist(card_id, &self.checklist_name)
            .await
            .inspect_err(|e| warn!("Failed to find checklist on {card_id}: {e}"))?;

        self.notifier
            .add_checklist_item(&checklist_id, &checklist_item_text(entry, tz))
            .await
            .inspect_err(|e| warn!("Failed to add item to checklist {checklist_id}: {e}"))?;

        debug!("Announced session of {} on {card_id}", member.id);
        Ok(())
    }
}

pub fn comment_text<Tz: TimeZone>(member: &Member, entry: &SessionEntry, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "🕒 {} clocked out — {}  (in {} → out {})",
        member.display_name,
        format_hours_minutes(entry.duration_minutes),
        local_hhmm(entry.start, tz),
        local_hhmm(entry.end, tz),
    )
}

/// The line is stamped with the local date of the clock-out, which is the day it gets posted.
/// For a session crossing midnight this is the day after [SessionEntry::day].
pub fn checklist_item_text<Tz: TimeZone>(entry: &SessionEntry, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "⏱ {} — {} → {} ({})",
        format_hours_minutes(entry.duration_minutes),
        local_hhmm(entry.start, tz),
        local_hhmm(entry.end, tz),
        day_key(local_date(entry.end, tz)),
    )
}
