//! The timekeeping engine.
//!
//! [Timecard] binds a [Store], a [Notifier], a [Clock] and the local timezone, and exposes the
//! operations the UI layer calls:
//!  - [Timecard::clock_in] and [Timecard::clock_out] drive the state machine.
//!  - [Timecard::current_label] and [Timecard::today_badge_text] are pure queries meant to be
//!    called on every render.

pub mod aggregator;
pub mod entities;
pub mod error;
pub mod records;
pub mod session_log;
pub mod state_machine;

use std::fmt::Display;

use aggregator::{badge_text, minutes_today, today_badge, TodayBadge};
use chrono::TimeZone;
use entities::{CardId, Member, MemberId, SessionEntry};
use error::EngineError;
use records::MemberRecords;
use session_log::SessionLog;
use tracing::{info, instrument, warn};

pub use state_machine::{ClockInOutcome, ClockState};

use crate::{
    notify::{NotificationDispatcher, Notifier, NotifyError},
    store::Store,
    utils::clock::Clock,
};

#[derive(Debug)]
pub enum ClockOutOutcome {
    NotActive,
    Completed(CompletedSession),
}

/// A committed clock-out. `notification` holds the advisory failure of announcing it, the
/// entry is recorded either way.
#[derive(Debug)]
pub struct CompletedSession {
    pub entry: SessionEntry,
    pub notification: Option<NotifyError>,
}

pub struct Timecard<S, N, Tz> {
    records: MemberRecords<S>,
    dispatcher: NotificationDispatcher<N>,
    clock: Box<dyn Clock>,
    tz: Tz,
}

impl<S, N, Tz> Timecard<S, N, Tz>
where
    S: Store,
    N: Notifier,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(
        store: S,
        dispatcher: NotificationDispatcher<N>,
        clock: Box<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            records: MemberRecords::new(store),
            dispatcher,
            clock,
            tz,
        }
    }

    #[instrument(skip_all, fields(member = %member.id, card = %card_id))]
    pub async fn clock_in(
        &self,
        member: &Member,
        card_id: &CardId,
    ) -> Result<ClockInOutcome, EngineError> {
        let now = self.clock.time();
        let outcome = self
            .records
            .update(&member.id, card_id, |record| record.clock_in(now))
            .await?;
        match &outcome {
            ClockInOutcome::Started(session) => info!("Clocked in at {}", session.start),
            ClockInOutcome::AlreadyActive(start) => info!("Already clocked in since {start}"),
        }
        Ok(outcome)
    }

    /// Records the open session and then announces it. Only the recording can fail the call.
    #[instrument(skip_all, fields(member = %member.id, card = %card_id))]
    pub async fn clock_out(
        &self,
        member: &Member,
        card_id: &CardId,
    ) -> Result<ClockOutOutcome, EngineError> {
        let now = self.clock.time();
        let tz = &self.tz;
        let entry = self
            .records
            .update(&member.id, card_id, |record| record.clock_out(now, tz))
            .await?;

        let Some(entry) = entry else {
            info!("Nothing to clock out");
            return Ok(ClockOutOutcome::NotActive);
        };
        info!(
            "Clocked out after {} minutes, attributed to {}",
            entry.duration_minutes, entry.day
        );

        let notification = self
            .dispatcher
            .announce(member, &entry, &self.tz)
            .await
            .inspect_err(|e| warn!("Clock out recorded but announcing it failed: {e}"))
            .err();

        Ok(ClockOutOutcome::Completed(CompletedSession {
            entry,
            notification,
        }))
    }

    pub async fn state(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<ClockState, EngineError> {
        Ok(self.records.load(member_id, card_id).await?.state())
    }

    pub async fn current_label(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<&'static str, EngineError> {
        Ok(self.state(member_id, card_id).await?.label())
    }

    pub async fn read_log(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<SessionLog, EngineError> {
        Ok(self.records.load(member_id, card_id).await?.log)
    }

    pub async fn minutes_today(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<i64, EngineError> {
        let record = self.records.load(member_id, card_id).await?;
        Ok(minutes_today(&record, self.clock.time(), &self.tz))
    }

    /// `None` until some time was worked today.
    pub async fn today_badge_text(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<Option<String>, EngineError> {
        Ok(badge_text(self.minutes_today(member_id, card_id).await?))
    }

    pub async fn today_badge(
        &self,
        member_id: &MemberId,
        card_id: &CardId,
    ) -> Result<Option<TodayBadge>, EngineError> {
        Ok(today_badge(self.minutes_today(member_id, card_id).await?))
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }
}
