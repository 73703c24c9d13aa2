//! `callme`: terminal dashboard for scheduled reminder calls.
//!
//! # Usage
//!
//! ```
//! callme --url http://localhost:8000
//! callme --config ~/.config/callme/callme.toml --log-file /tmp/callme.log
//! ```

mod app;
mod client;
mod form;
mod ui;

#[cfg(test)]
mod testing;

use std::{
  fs::OpenOptions,
  io,
  path::{Path, PathBuf},
  sync::Mutex,
  time::{Duration, Instant},
};

use anyhow::{Context, Result};
use app::App;
use callme_core::validate;
use callme_store::{ReminderStore, StoreConfig};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "callme", version, about = "Terminal dashboard for call-me reminders")]
struct Args {
  /// Path to a TOML config file. Missing is fine.
  #[arg(short, long, value_name = "FILE", default_value = "callme.toml")]
  config: PathBuf,

  /// Base URL of the reminders backend.
  #[arg(long)]
  url: Option<String>,

  /// Default IANA timezone for new reminders.
  #[arg(long)]
  timezone: Option<String>,

  /// Write logs to this file. The dashboard owns the terminal, so there is
  /// no logging without it.
  #[arg(long, value_name = "FILE")]
  log_file: Option<PathBuf>,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Resolved settings: defaults < config file < `CALLME_*` env < CLI flags.
#[derive(Debug, Clone, Deserialize)]
struct Settings {
  base_url:     String,
  timeout_secs: u64,
  stale_secs:   u64,
  refetch_secs: u64,
  timezone:     String,
}

fn load_settings(args: &Args) -> Result<Settings> {
  let settings: Settings = config::Config::builder()
    .set_default("base_url", "http://localhost:8000")?
    .set_default("timeout_secs", 10)?
    .set_default("stale_secs", 30)?
    .set_default("refetch_secs", 60)?
    .set_default("timezone", "UTC")?
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("CALLME").try_parsing(true))
    .set_override_option("base_url", args.url.clone())?
    .set_override_option("timezone", args.timezone.clone())?
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .context("failed to deserialise settings")?;

  validate::validate_timezone(&settings.timezone)
    .with_context(|| format!("invalid default timezone {:?}", settings.timezone))?;
  Ok(settings)
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
  let Some(path) = log_file else {
    return Ok(());
  };
  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  init_tracing(args.log_file.as_deref())?;
  let settings = load_settings(&args)?;
  tracing::info!(base_url = %settings.base_url, "starting");

  let client = ApiClient::new(ApiConfig {
    base_url: settings.base_url.clone(),
    timeout:  Duration::from_secs(settings.timeout_secs),
  })?;
  let store = ReminderStore::new(client, StoreConfig {
    stale_time: Duration::from_secs(settings.stale_secs),
  });
  let mut app = App::new(store, settings.timezone.clone());

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // A failed first load is reported in the status bar, not fatal.
  app.load().await;
  let refetch = Duration::from_secs(settings.refetch_secs.max(1));
  let run_result = run_event_loop(&mut terminal, &mut app, refetch).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<ApiClient>,
  refetch: Duration,
) -> Result<()> {
  let mut changes = app.store.subscribe();
  let mut dirty = true;
  let mut last_draw = Instant::now();
  let mut last_refetch = Instant::now();

  loop {
    if app.drain_outcomes() {
      dirty = true;
    }
    if changes.has_changed().unwrap_or(false) {
      changes.borrow_and_update();
      dirty = true;
    }
    // Countdowns tick even when nothing else changes.
    if dirty || last_draw.elapsed() >= Duration::from_secs(1) {
      terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;
      dirty = false;
      last_draw = Instant::now();
    }

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    match maybe_event {
      Some(Event::Key(key)) => {
        if !app.handle_key(key) {
          break;
        }
        dirty = true;
      }
      Some(Event::Resize(_, _)) => dirty = true,
      _ => {}
    }

    if last_refetch.elapsed() >= refetch {
      tracing::debug!("periodic refetch");
      app.store.refresh_all();
      last_refetch = Instant::now();
    }
  }

  Ok(())
}
