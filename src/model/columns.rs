//! Column bookkeeping
//!
//! Tracks which record fields are shown as table columns, which are moved to
//! the extra info footer, and how values of each column are turned into text.

use super::record::Value;
use std::collections::HashMap;
use std::fmt;

/// Display conversion for the raw values of one column
pub type Translation = Box<dyn Fn(&Value) -> String>;

/// Main columns, extra info columns and per-column translations.
///
/// A name is in at most one of `main` and `extra_info`.
#[derive(Default)]
pub struct ColumnSet {
    main: Vec<String>,
    extra_info: Vec<String>,
    translations: HashMap<String, Translation>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Main column names in first-seen order
    pub fn main(&self) -> &[String] {
        &self.main
    }

    /// Footer column names in the order they were moved there
    pub fn extra_info(&self) -> &[String] {
        &self.extra_info
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.main.iter().any(|c| c == name) || self.extra_info.iter().any(|c| c == name)
    }

    /// Append a main column unless the name is already tracked
    pub fn add_column(&mut self, name: &str) {
        if !self.is_tracked(name) {
            self.main.push(name.to_string());
        }
    }

    /// Move a main column to the footer. No-op for any other name.
    pub fn set_extra_info(&mut self, name: &str) {
        if let Some(pos) = self.main.iter().position(|c| c == name) {
            let column = self.main.remove(pos);
            self.extra_info.push(column);
        }
    }

    pub fn set_translation<F>(&mut self, name: &str, translation: F)
    where
        F: Fn(&Value) -> String + 'static,
    {
        self.translations
            .insert(name.to_string(), Box::new(translation));
    }

    /// Display text for a value of `column`
    pub fn display(&self, column: &str, value: &Value) -> String {
        match self.translations.get(column) {
            Some(translate) => translate(value),
            None => value.to_string(),
        }
    }
}

impl fmt::Debug for ColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut translated: Vec<&String> = self.translations.keys().collect();
        translated.sort();
        f.debug_struct("ColumnSet")
            .field("main", &self.main)
            .field("extra_info", &self.extra_info)
            .field("translated", &translated)
            .finish()
    }
}
