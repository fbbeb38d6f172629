use chrono::{DateTime, TimeZone, Utc};

use crate::utils::time::{floor_minutes, format_hours_minutes, local_date};

use super::state_machine::MemberRecord;

pub const BADGE_PREFIX: &str = "Today: ";
pub const BADGE_COLOR: &str = "blue";

/// Badge shown on the card with today's total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodayBadge {
    pub text: String,
    pub color: &'static str,
}

/// Minutes worked on the local day of `now`: every completed entry of that day plus the elapsed
/// part of an open session that also started that day. Depends on `now`, so never cache it.
pub fn minutes_today<Tz: TimeZone>(record: &MemberRecord, now: DateTime<Utc>, tz: &Tz) -> i64 {
    let today = local_date(now, tz);
    let completed = record.log.minutes_on(today);
    let live = match &record.active {
        Some(active) if local_date(active.start, tz) == today => {
            floor_minutes(active.start, now).max(0)
        }
        _ => 0,
    };
    completed + live
}

pub fn badge_text(minutes: i64) -> Option<String> {
    (minutes > 0).then(|| format_hours_minutes(minutes))
}

pub fn today_badge(minutes: i64) -> Option<TodayBadge> {
    badge_text(minutes).map(|text| TodayBadge {
        text: format!("{BADGE_PREFIX}{text}"),
        color: BADGE_COLOR,
    })
}
