//! Model layer - dashboard state
//!
//! This module contains all state-related types:
//! - `Record` / `Value` - schema-free records from the export
//! - `RecordStore` - ordered records with unique-key merge
//! - `ColumnSet` - table columns, footer columns and translations
//! - `ViewState` - scroll, selection and terminal size

pub mod columns;
pub mod record;
pub mod store;
pub mod view;

// Re-export commonly used types
pub use columns::ColumnSet;
pub use record::{parse_records, Record, Value};
pub use store::{MergeReport, RecordStore};
pub use view::ViewState;
