//! External service interactions
//!
//! This module contains services for interacting with external systems:
//! - Record export through an external command
//! - Background watching of the backing files
//! - Taskwarrior display translations

pub mod export;
pub mod taskwarrior;
pub mod watcher;

pub use export::CommandExport;
pub use watcher::Batch;
