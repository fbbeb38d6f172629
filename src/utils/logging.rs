use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 7;

/// Filter that only lets through events of this crate. An explicit `level` wins over
/// `RUST_LOG`, which wins over `info`.
fn crate_filter(level: Option<LevelFilter>, env_level: Option<String>) -> EnvFilter {
    let level = level
        .map(|v| v.to_string())
        .or(env_level)
        .unwrap_or_else(|| "info".into());
    EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME")))
}

/// Sends clock in/out traces to a daily file under `<app_dir>/logs`, and to stdout when
/// `show_std` is set.
pub fn enable_logging(
    prefix: &str,
    app_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(app_dir.join(LOG_DIR))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(log_level, std::env::var("RUST_LOG").ok()))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(crate_filter(
            None,
            Some(std::env::var("RUST_LOG").unwrap_or_else(|_| "trace".into())),
        ))
        .with_test_writer()
        .try_init();
});
