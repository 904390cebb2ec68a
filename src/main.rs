mod api;
mod app;
mod auth;
mod commands;
mod config;
mod event;
mod listing;
mod queries;
mod store;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "barista")]
#[command(about = "A terminal admin console for a coffee-shop backend, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/barista/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend origin, overriding the config file
  #[arg(short, long)]
  server: Option<String>,
}

/// Route logs to a file: the TUI owns the terminal, so stderr is not an
/// option. The guard must stay alive for the rest of main.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::cache_dir()
    .map(|dir| dir.join("barista"))
    .unwrap_or_else(|| PathBuf::from("."));
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "barista.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barista=info")),
    )
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override server if specified on command line
  let config = if let Some(url) = args.server {
    config::Config {
      server: config::ServerConfig { url },
      ..config
    }
  } else {
    config
  };

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
