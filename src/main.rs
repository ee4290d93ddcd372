//! taskhud - a live terminal dashboard for Taskwarrior
//!
//! Exports the task list, shows it as a scrollable table and re-exports
//! whenever Taskwarrior's data files change. Follows the ratatui component
//! architecture: events become Actions, the App updates its state, then draws.

mod action;
mod app;
mod component;
mod components;
mod config;
mod error;
mod model;
mod services;
mod tui;

use crate::action::Action;
use crate::app::App;
use crate::component::Component;
use crate::config::Config;
use crate::services::{watcher, CommandExport};
use crate::tui::Tui;
use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::Event;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex};
use std::time::Duration;
use tracing::{info, trace};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskhud", version, about = "Live terminal dashboard for Taskwarrior")]
struct Args {
    /// Config file (default: ~/.taskhud/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Taskwarrior data directory
    #[arg(long)]
    data_dir: Option<String>,

    /// Taskwarrior executable
    #[arg(long)]
    task_command: Option<String>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[arg(long)]
    export_timeout_ms: Option<u64>,

    /// Field to keep records sorted by
    #[arg(long)]
    sort_key: Option<String>,

    /// Write logs here; RUST_LOG sets the level
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(command) = self.task_command {
            config.task_command = command;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.export_timeout_ms {
            config.export_timeout_ms = ms;
        }
        if self.sort_key.is_some() {
            config.sort_key = self.sort_key;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file;
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("taskhud: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    init_logging(config.log_file.as_deref())?;

    // Everything that can fail fatally happens before the terminal is taken over
    let export = CommandExport::new(
        config.task_command.clone(),
        config.export_args.clone(),
        config.export_timeout(),
    );
    info!(command = %export.display_command(), "starting");

    let (tx, rx) = mpsc::channel();
    let watcher = watcher::spawn(&config.watch_paths(), export, config.poll_interval(), tx)?;

    let mut app = App::new(&config, rx);
    app.init()?;

    let mut tui = Tui::new()?.with_tick_rate(Duration::from_millis(100));
    tui.enter()?;

    let result = run_app(&mut tui, &mut app);

    tui.exit()?;
    watcher.stop();
    info!("exiting");

    result
}

/// Log to `path` if given; otherwise discard, since the screen belongs to the TUI
fn init_logging(path: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .init();
        }
    }
    Ok(())
}

/// Run the frame loop until the App asks to quit
fn run_app(tui: &mut Tui, app: &mut App) -> Result<()> {
    while !app.should_quit {
        // Merge whatever the watcher published since the last frame
        app.sync_updates();

        let mut drawn = Ok(());
        tui.draw(|frame| {
            drawn = app.draw(frame, frame.area());
        })?;
        drawn?;

        let action = match tui.next_event()? {
            Some(Event::Key(key)) => app.handle_key_event(key)?,
            Some(Event::Resize(w, h)) => {
                tui.clear()?;
                Some(Action::Resize(w, h))
            }
            Some(_) => None,
            None => Some(Action::Tick),
        };

        let mut current = action;
        while let Some(action) = current {
            if action != Action::Tick {
                trace!(%action, "dispatch");
            }
            current = app.update(action)?;
        }
    }

    Ok(())
}
