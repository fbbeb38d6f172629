use ansi_term::Colour;
use chrono::{NaiveDate, TimeZone};

use crate::{
    engine::{
        aggregator::TodayBadge,
        entities::{CardId, Member},
        session_log::SessionLog,
        ClockInOutcome, ClockOutOutcome,
    },
    utils::time::{day_key, format_hours_minutes, local_hhmm},
};

use super::config::TimecardConfig;

pub fn print_config(config: &TimecardConfig) {
    println!(
        "member: {}\ndisplay name: {}\nchecklist: {}",
        config.member_id.as_deref().unwrap_or("-"),
        config.display_name.as_deref().unwrap_or("-"),
        config.checklist_name
    );
}

pub fn print_clock_in<Tz: TimeZone>(outcome: &ClockInOutcome, tz: &Tz)
where
    Tz::Offset: std::fmt::Display,
{
    let colour = match outcome {
        ClockInOutcome::Started(_) => Colour::Green,
        ClockInOutcome::AlreadyActive(_) => Colour::Yellow,
    };
    println!("{}", colour.paint(clock_in_message(outcome, tz)));
}

pub fn print_clock_out<Tz: TimeZone>(outcome: &ClockOutOutcome, tz: &Tz)
where
    Tz::Offset: std::fmt::Display,
{
    match outcome {
        ClockOutOutcome::NotActive => {
            println!("{}", Colour::Yellow.paint(clock_out_message(outcome, tz)))
        }
        ClockOutOutcome::Completed(completed) => {
            if let Some(e) = &completed.notification {
                eprintln!(
                    "{}",
                    Colour::Yellow.paint(format!(
                        "Clocked out, but posting the comment/checklist failed (try again later): {e}"
                    ))
                );
            }
            println!("{}", Colour::Green.paint(clock_out_message(outcome, tz)));
        }
    }
}

pub fn print_status(member: &Member, card: &CardId, label: &str, badge: Option<&TodayBadge>) {
    let badge = match badge {
        Some(badge) => badge_colour(badge.color).paint(badge.text.as_str()).to_string(),
        None => "Nothing yet today".to_string(),
    };
    println!("{} on {card}\t[{label}]\t{badge}", member.display_name);
}

pub fn print_log<Tz: TimeZone>(log: &SessionLog, day: NaiveDate, tz: &Tz)
where
    Tz::Offset: std::fmt::Display,
{
    for line in log_lines(log, day, tz) {
        println!("{line}");
    }
}

pub fn clock_in_message<Tz: TimeZone>(outcome: &ClockInOutcome, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match outcome {
        ClockInOutcome::Started(session) => {
            format!("Clocked in at {}.", local_hhmm(session.start, tz))
        }
        ClockInOutcome::AlreadyActive(start) => {
            format!("You are already clocked in since {}.", local_hhmm(*start, tz))
        }
    }
}

pub fn clock_out_message<Tz: TimeZone>(outcome: &ClockOutOutcome, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match outcome {
        ClockOutOutcome::NotActive => "There is no running session to clock out of.".to_string(),
        ClockOutOutcome::Completed(completed) => format!(
            "Clocked out, total {} (in {} → out {}).",
            format_hours_minutes(completed.entry.duration_minutes),
            local_hhmm(completed.entry.start, tz),
            local_hhmm(completed.entry.end, tz),
        ),
    }
}

pub fn log_lines<Tz: TimeZone>(log: &SessionLog, day: NaiveDate, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = log
        .entries_on(day)
        .map(|e| {
            format!(
                "{}\t{} → {}\t{}",
                day_key(e.day),
                local_hhmm(e.start, tz),
                local_hhmm(e.end, tz),
                format_hours_minutes(e.duration_minutes)
            )
        })
        .collect::<Vec<_>>();
    lines.push(format!(
        "{}\ttotal\t{}",
        day_key(day),
        format_hours_minutes(log.minutes_on(day))
    ));
    lines
}

fn badge_colour(name: &str) -> Colour {
    match name {
        "blue" => Colour::Blue,
        "green" => Colour::Green,
        "red" => Colour::Red,
        "yellow" => Colour::Yellow,
        _ => Colour::White,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::engine::{
        state_machine::MemberRecord, ClockInOutcome, ClockOutOutcome, CompletedSession,
    };

    use super::{clock_in_message, clock_out_message, log_lines};

    #[test]
    fn test_messages() {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 10, 1, 1).unwrap();
        let mut record = MemberRecord::new("ada".into(), "card".into());
        let ClockInOutcome::Started(session) = record.clock_in(start) else {
            panic!("expected a new session");
        };
        let entry = record.clock_out(end, &Utc).unwrap();

        assert_eq!(
            clock_in_message(&ClockInOutcome::Started(session), &Utc),
            "Clocked in at 09:00."
        );
        assert_eq!(
            clock_in_message(&ClockInOutcome::AlreadyActive(start), &Utc),
            "You are already clocked in since 09:00."
        );
        assert_eq!(
            clock_out_message(
                &ClockOutOutcome::Completed(CompletedSession {
                    entry,
                    notification: None
                }),
                &Utc
            ),
            "Clocked out, total 1h 1m (in 09:00 → out 10:01)."
        );
    }

    #[test]
    fn test_log_lines_end_with_total() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let mut record = MemberRecord::new("ada".into(), "card".into());
        record.clock_in(Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap());
        record.clock_out(Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap(), &Utc);
        record.clock_in(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        record.clock_out(Utc.with_ymd_and_hms(2025, 3, 14, 9, 45, 0).unwrap(), &Utc);

        assert_eq!(
            log_lines(&record.log, day, &Utc),
            vec![
                "2025-03-14\t08:00 → 08:30\t0h 30m",
                "2025-03-14\t09:00 → 09:45\t0h 45m",
                "2025-03-14\ttotal\t1h 15m",
            ]
        );
    }
}
