//! UI Components
//!
//! Painting of the dashboard and the column width computation it relies on.
//! The App component owns all state; these only read it.

pub mod hud;
pub mod layout;

pub use hud::Hud;
