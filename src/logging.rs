use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `marquee=debug`
pub const LOG_ENV: &str = "MARQUEE_LOG";
const DEFAULT_FILTER: &str = "marquee=info";

/// Directory of the daily log files: `$XDG_DATA_HOME/marquee`
pub fn log_dir() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(std::env::temp_dir)
    .join("marquee")
}

/// Route tracing output to a daily rolling file. The terminal belongs to
/// the UI, so nothing is written to stdout or stderr.
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init() -> Result<WorkerGuard> {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let appender = tracing_appender::rolling::daily(log_dir(), "marquee.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer),
    )
    .try_init()
    .map_err(|err| eyre!("failed to install tracing subscriber: {}", err))?;

  Ok(guard)
}
