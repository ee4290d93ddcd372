//! Root application component
//!
//! The App owns the dashboard session: the record store, the column set and
//! the viewport. Record batches from the watcher arrive over a channel and
//! are merged here, on the render thread, at the start of every frame.

use crate::action::Action;
use crate::component::Component;
use crate::components::Hud;
use crate::config::Config;
use crate::error::StoreError;
use crate::model::{ColumnSet, MergeReport, RecordStore, ViewState};
use crate::services::{taskwarrior, Batch};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{layout::Rect, Frame};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{error, info, warn};

const APP_NAME: &str = "taskhud";

/// Main application state
pub struct App {
    pub store: RecordStore,
    pub columns: ColumnSet,
    pub view: ViewState,

    /// Batches published by the watcher; `None` once the watcher is gone
    updates: Option<Receiver<Batch>>,

    /// Fields to keep in the footer whenever they show up
    extra_info: Vec<String>,

    /// Flag to indicate the app should quit
    pub should_quit: bool,

    /// Last merge failure, shown in the title bar until the next good merge
    pub last_error: Option<String>,

    /// Time of the last successful merge
    pub last_update: Option<DateTime<Local>>,
}

impl App {
    /// Create a new App reading batches from `updates`
    pub fn new(config: &Config, updates: Receiver<Batch>) -> App {
        let mut store = RecordStore::new();
        if let Some(key) = &config.unique_key {
            store.set_unique_key(key);
        }
        if let Some(key) = &config.sort_key {
            store.set_sort_key(key);
        }

        let mut columns = ColumnSet::new();
        taskwarrior::install_translations(&mut columns);

        App {
            store,
            columns,
            view: ViewState::new(0, 0, config.footer_height),
            updates: Some(updates),
            extra_info: config.extra_info.clone(),
            should_quit: false,
            last_error: None,
            last_update: None,
        }
    }

    /// Merge one batch, then move configured fields to the footer
    fn apply_batch(&mut self, batch: Batch) -> Result<MergeReport, StoreError> {
        let report = self.store.add_records(batch, &mut self.columns)?;
        for field in &self.extra_info {
            self.columns.set_extra_info(field);
        }
        self.last_update = Some(Local::now());
        self.last_error = None;
        Ok(report)
    }

    /// Merge every batch waiting on the channel.
    ///
    /// A rejected batch is logged and dropped; the store keeps its previous
    /// records. Returns the number of batches merged.
    pub fn sync_updates(&mut self) -> usize {
        let mut merged = 0;
        while let Some(rx) = &self.updates {
            match rx.try_recv() {
                Ok(batch) => match self.apply_batch(batch) {
                    Ok(report) => {
                        merged += 1;
                        if report.added + report.updated > 0 {
                            info!(
                                added = report.added,
                                updated = report.updated,
                                total = self.store.len(),
                                "records refreshed"
                            );
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "rejected record batch");
                        self.last_error = Some(e.to_string());
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("watcher disconnected, records will no longer refresh");
                    self.updates = None;
                }
            }
        }
        merged
    }

    /// Text of the title bar
    pub fn title(&self) -> String {
        let mut title = format!(" {} │ {} records", APP_NAME, self.store.len());
        if let Some(at) = self.last_update {
            title.push_str(&format!(" │ updated {}", at.format("%H:%M:%S")));
        }
        if self.updates.is_none() {
            title.push_str(" │ not watching");
        }
        if let Some(err) = &self.last_error {
            title.push_str(&format!(" │ error: {}", err));
        }
        title
    }
}

impl Component for App {
    /// Merge whatever the watcher fetched before startup; a rejected batch
    /// here aborts startup.
    fn init(&mut self) -> Result<()> {
        let Some(rx) = &self.updates else {
            return Ok(());
        };
        let pending: Vec<Batch> = rx.try_iter().collect();
        for batch in pending {
            self.apply_batch(batch)
                .context("initial records rejected")?;
        }
        info!(
            records = self.store.len(),
            unique_key = self.store.unique_key().unwrap_or("-"),
            "initial records loaded"
        );
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::NextItem),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::PrevItem),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Action::FirstItem),
            KeyCode::Char('G') | KeyCode::End => Some(Action::LastItem),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        let count = self.store.len();
        match action {
            Action::Tick => {}
            Action::Resize(w, h) => self.view.resize(w, h),
            Action::Quit => self.should_quit = true,
            Action::NextItem => self.view.select_next(count),
            Action::PrevItem => self.view.select_prev(),
            Action::PageDown => self.view.page_down(count),
            Action::PageUp => self.view.page_up(),
            Action::FirstItem => self.view.select_first(),
            Action::LastItem => self.view.select_last(count),
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        self.view.resize(area.width, area.height);
        let title = self.title();
        frame.render_widget(
            Hud {
                title: &title,
                store: &self.store,
                columns: &self.columns,
                view: &self.view,
            },
            area,
        );
        Ok(())
    }
}
