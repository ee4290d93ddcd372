//! Action enum - All possible application actions
//!
//! Actions are discrete operations that the application can perform.
//! Key events are turned into Actions, and the App processes them to update
//! the viewport.

use std::fmt;

/// All possible actions in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // ─────────────────────────────────────────────────────────────────────────
    // App Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// No input this frame
    Tick,
    /// Terminal was resized
    Resize(u16, u16),
    /// Leave the dashboard
    Quit,

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────
    /// Move selection to the next record
    NextItem,
    /// Move selection to the previous record
    PrevItem,
    /// Move selection down one page
    PageDown,
    /// Move selection up one page
    PageUp,
    /// Jump to first record
    FirstItem,
    /// Jump to last record
    LastItem,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Tick => write!(f, "Tick"),
            Action::Resize(w, h) => write!(f, "Resize({}, {})", w, h),
            Action::Quit => write!(f, "Quit"),
            Action::NextItem => write!(f, "NextItem"),
            Action::PrevItem => write!(f, "PrevItem"),
            Action::PageDown => write!(f, "PageDown"),
            Action::PageUp => write!(f, "PageUp"),
            Action::FirstItem => write!(f, "FirstItem"),
            Action::LastItem => write!(f, "LastItem"),
        }
    }
}
