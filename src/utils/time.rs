
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

const MINUTE_MS: i64 = 60_000;

/// This is the standard way of converting a date to a string in timecard.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Calendar date of `moment` as seen in `tz`.
pub fn local_date<Tz: TimeZone>(moment: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    moment.with_timezone(tz).date_naive()
}

/// Wall clock `HH:MM` of `moment` as seen in `tz`.
pub fn local_hhmm<Tz: TimeZone>(moment: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment.with_timezone(tz).format("%H:%M").to_string()
}

/// Whole minutes between two instants, rounded towards negative infinity.
pub fn floor_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds().div_euclid(MINUTE_MS)
}

/// Renders minutes as `"{h}h {m}m"`. Hours are never dropped, so 45 minutes is `"0h 45m"`.
pub fn format_hours_minutes(minutes: i64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
