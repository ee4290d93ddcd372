//! Taskwarrior display conventions
//!
//! Translations from Taskwarrior's export format to readable column text.

use crate::model::{ColumnSet, Value};
use chrono::{Local, NaiveDateTime, TimeZone, Utc};

/// Fields holding Taskwarrior timestamps
pub const DATE_FIELDS: &[&str] = &["due", "entry", "end", "start", "scheduled", "wait", "until"];

/// Format of timestamps in `task export`, always UTC
const EXPORT_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Register every Taskwarrior translation on `columns`
pub fn install_translations(columns: &mut ColumnSet) {
    for field in DATE_FIELDS {
        columns.set_translation(field, local_date);
    }
    columns.set_translation("tags", tags);
    columns.set_translation("urgency", urgency);
    columns.set_translation("priority", priority);
}

/// `20240315T143000Z` -> `2024-03-15 15:30:00` in the local time zone
pub fn local_date(value: &Value) -> String {
    let Value::Text(raw) = value else {
        return value.to_string();
    };
    match NaiveDateTime::parse_from_str(raw, EXPORT_DATE_FORMAT) {
        Ok(naive) => Utc
            .from_utc_datetime(&naive)
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => raw.clone(),
    }
}

/// `["home", "next"]` -> `home, next`
pub fn tags(value: &Value) -> String {
    match value {
        Value::TextList(items) => items.join(", "),
        other => other.to_string(),
    }
}

/// Right-aligned on the decimal point with two decimals
pub fn urgency(value: &Value) -> String {
    match value {
        Value::Float(x) => format!("{:>6.2}", x),
        Value::Integer(i) => format!("{:>6.2}", *i as f64),
        other => other.to_string(),
    }
}

pub fn priority(value: &Value) -> String {
    match value {
        Value::Text(p) => match p.as_str() {
            "H" => "HIGH".to_string(),
            "M" => "MED".to_string(),
            "L" => "LOW".to_string(),
            _ => p.clone(),
        },
        other => other.to_string(),
    }
}
