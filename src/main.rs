mod app;
mod commands;
mod event;
mod logging;
mod ui;

use clap::Parser;
use color_eyre::Result;
use marquee::Config;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "Terminal front end for the marquee streaming backend")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/marquee/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Movie whose comments open on startup
  #[arg(short, long)]
  movie: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  let mut config = Config::load(args.config.as_deref())?;
  if let Some(movie) = args.movie {
    config.default_movie = Some(movie);
  }
  info!(backend = %config.backend.url, log_dir = %logging::log_dir().display(), "starting");

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
