pub mod config;
pub mod output;

use std::{fmt::Display, path::PathBuf};

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{Parser, Subcommand, ValueEnum};
use config::TimecardConfig;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    engine::{
        entities::{CardId, Member},
        Timecard,
    },
    identity::{ConfiguredIdentity, Identity},
    notify::{outbox::OutboxNotifier, NotificationDispatcher},
    store::file::FileStore,
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

pub type LocalTimecard = Timecard<FileStore, OutboxNotifier, Local>;

#[derive(Parser, Debug)]
#[command(name = "timecard", version, long_about = None)]
#[command(about = "Clock in and out of cards and see how long you worked today", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Member to act as. Overrides member_id from config.json")]
    member: Option<String>,
    #[arg(long = "log-filter", global = true)]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start a session on a card")]
    In {
        #[arg(help = "Card to clock in on")]
        card: String,
    },
    #[command(about = "Finish the running session on a card and announce it")]
    Out {
        #[arg(help = "Card to clock out of")]
        card: String,
    },
    #[command(about = "Show the next action and today's total for a card")]
    Status {
        #[arg(help = "Card to inspect")]
        card: String,
    },
    #[command(about = "List recorded sessions of a day")]
    Log {
        #[arg(help = "Card to inspect")]
        card: String,
        #[arg(
            long,
            short,
            help = "Day to list. Examples are \"yesterday\", \"15/03/2025\". Defaults to today"
        )]
        day: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Store who you are and where sessions are announced")]
    Config {
        #[arg(long = "member-id")]
        member_id: Option<String>,
        #[arg(long = "display-name")]
        display_name: Option<String>,
        #[arg(long = "checklist", help = "Name of the checklist sessions are added to")]
        checklist_name: Option<String>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;
    enable_logging(CLI_PREFIX, &app_dir, args.log, args.log_console)?;

    let mut config = TimecardConfig::load(&app_dir)?;

    match args.commands {
        Commands::Config {
            member_id,
            display_name,
            checklist_name,
        } => {
            config.member_id = member_id.or(config.member_id);
            config.display_name = display_name.or(config.display_name);
            config.checklist_name = checklist_name.unwrap_or(config.checklist_name);
            config.save(&app_dir)?;
            info!("Saved configuration {config:?}");
            output::print_config(&config);
        }
        Commands::In { card } => {
            let (member, timecard) = open(app_dir, &config, args.member).await?;
            let outcome = timecard.clock_in(&member, &CardId::from(card)).await?;
            output::print_clock_in(&outcome, timecard.timezone());
        }
        Commands::Out { card } => {
            let (member, timecard) = open(app_dir, &config, args.member).await?;
            let outcome = timecard.clock_out(&member, &CardId::from(card)).await?;
            output::print_clock_out(&outcome, timecard.timezone());
        }
        Commands::Status { card } => {
            let (member, timecard) = open(app_dir, &config, args.member).await?;
            let card = CardId::from(card);
            let label = timecard.current_label(&member.id, &card).await?;
            let badge = timecard.today_badge(&member.id, &card).await?;
            output::print_status(&member, &card, label, badge.as_ref());
        }
        Commands::Log {
            card,
            day,
            date_style,
        } => {
            let day = parse_day(day, date_style)?;
            let (member, timecard) = open(app_dir, &config, args.member).await?;
            let log = timecard
                .read_log(&member.id, &CardId::from(card))
                .await?;
            output::print_log(&log, day, timecard.timezone());
        }
    }
    Ok(())
}

/// Resolves the acting member and wires the engine to the files in `app_dir`.
async fn open(
    app_dir: PathBuf,
    config: &TimecardConfig,
    member_override: Option<String>,
) -> Result<(Member, LocalTimecard)> {
    let (member_id, display_name) = config.identity_for(member_override);
    let member = ConfiguredIdentity::new(member_id, display_name)
        .current_member()
        .await?;
    Ok((member, create_timecard(app_dir, config)?))
}

fn create_timecard(app_dir: PathBuf, config: &TimecardConfig) -> Result<LocalTimecard> {
    let store = FileStore::new(app_dir.join("store"))?;
    let notifier = OutboxNotifier::new(app_dir.join("outbox.jsonl"));
    Ok(Timecard::new(
        store,
        NotificationDispatcher::new(notifier, config.checklist_name.clone()),
        Box::new(DefaultClock),
        Local,
    ))
}

fn parse_day(day: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let now = Local::now();
    match day {
        Some(day) => parse_date_string(&day, now, date_style.into())
            .map(|v| v.date_naive())
            .map_err(|e| anyhow!("Failed to validate day {day}: {e}")),
        None => Ok(now.date_naive()),
    }
}
