//! Column width calculation and cell truncation

use crate::model::{ColumnSet, Record};

/// Left border plus padding, and one space right of the header
const COLUMN_PADDING: usize = 3;

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Computed widths of the main columns, in column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub widths: Vec<usize>,
    /// Set when the shrink pass hit the one-character floor before fitting
    pub degraded: bool,
}

impl ColumnLayout {
    /// Sum of all column widths (the x of the closing border)
    pub fn total(&self) -> usize {
        self.widths.iter().sum()
    }

    /// First terminal column of the column at `index`
    pub fn column_start(&self, index: usize) -> usize {
        self.widths.iter().take(index).sum()
    }
}

/// Compute column widths that fit every displayed value and the terminal width.
///
/// Each column starts at its widest translated value (or header) plus padding.
/// While the total is not below `terminal_width`, the widest column (leftmost on
/// ties) loses one character. Widths never drop below 1; if that floor is hit
/// the layout is marked degraded and left overlapping.
pub fn compute_widths(
    records: &[Record],
    columns: &ColumnSet,
    terminal_width: usize,
) -> ColumnLayout {
    let mut widths: Vec<usize> = columns
        .main()
        .iter()
        .map(|column| {
            let content_width = records
                .iter()
                .filter_map(|r| r.get(column))
                .map(|value| text_len(&columns.display(column, value)))
                .max()
                .unwrap_or(0);

            (content_width + COLUMN_PADDING).max(text_len(column) + COLUMN_PADDING)
        })
        .collect();

    let mut degraded = false;
    let mut total: usize = widths.iter().sum();
    while !widths.is_empty() && total >= terminal_width {
        let widest = leftmost_max(&widths);
        if widths[widest] <= 1 {
            degraded = true;
            break;
        }
        widths[widest] -= 1;
        total -= 1;
    }

    ColumnLayout { widths, degraded }
}

fn leftmost_max(widths: &[usize]) -> usize {
    let mut best = 0;
    for (i, &w) in widths.iter().enumerate() {
        if w > widths[best] {
            best = i;
        }
    }
    best
}

/// Display length of text, counted in characters
pub fn text_len(text: &str) -> usize {
    text.chars().count()
}

/// Fit text into a column of `width`.
///
/// Text shorter than `width - 2` is returned as is. Anything longer becomes its
/// first `width - 6` characters followed by `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text_len(text) < width.saturating_sub(2) {
        return text.to_string();
    }
    let keep = width.saturating_sub(6);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordStore, Value};

    fn layout_for(batch: Vec<Record>, terminal_width: usize) -> (ColumnLayout, ColumnSet) {
        let mut store = RecordStore::new();
        let mut columns = ColumnSet::new();
        store.set_unique_key("id");
        store.add_records(batch, &mut columns).unwrap();
        let layout = compute_widths(store.records(), &columns, terminal_width);
        (layout, columns)
    }

    #[test]
    fn test_width_fits_longest_value() {
        let long = "bbbbbbbbbbbbbbbbbbbbb";
        let (layout, columns) = layout_for(
            vec![
                Record::new().with("id", 1).with("name", "a"),
                Record::new().with("id", 2).with("name", long),
            ],
            200,
        );
        assert_eq!(columns.main(), ["id", "name"]);
        assert!(layout.widths[1] >= long.len() + 3);
        assert!(!layout.degraded);
    }

    #[test]
    fn test_width_falls_back_to_header_length() {
        let (layout, _) = layout_for(
            vec![Record::new().with("id", 1).with("description", "x")],
            200,
        );
        // "id" header (2) vs value "1" (1); "description" header (11)
        assert_eq!(layout.widths, vec![5, 14]);
        assert_eq!(layout.total(), 19);
        assert_eq!(layout.column_start(1), 5);
    }

    #[test]
    fn test_width_uses_translated_text() {
        let mut store = RecordStore::new();
        let mut columns = ColumnSet::new();
        store
            .add_record(Record::new().with("id", 1).with("tags", vec!["a".to_string()]), &mut columns)
            .unwrap();
        columns.set_translation("tags", |_| "twelve chars".to_string());

        let layout = compute_widths(store.records(), &columns, 200);
        assert_eq!(layout.widths[1], 12 + 3);
    }

    #[test]
    fn test_missing_field_counts_as_zero_width() {
        let mut columns = ColumnSet::new();
        columns.add_column("ghost");
        let layout = compute_widths(&[], &columns, 80);
        assert_eq!(layout.widths, vec![8]);
    }

    #[test]
    fn test_shrink_takes_from_widest_leftmost_first() {
        let (layout, _) = layout_for(
            vec![Record::new()
                .with("id", 1)
                .with("a", "x".repeat(20))
                .with("b", "y".repeat(20))],
            40,
        );
        // start [5, 23, 23] = 51; must reach 39
        assert_eq!(layout.total(), 39);
        assert_eq!(layout.widths, vec![5, 17, 17]);

        let (layout, _) = layout_for(
            vec![Record::new()
                .with("id", 1)
                .with("a", "x".repeat(20))
                .with("b", "y".repeat(20))],
            52,
        );
        assert_eq!(layout.total(), 51);
        assert_eq!(layout.widths, vec![5, 23, 23]);

        let (layout, _) = layout_for(
            vec![Record::new()
                .with("id", 1)
                .with("a", "x".repeat(20))
                .with("b", "y".repeat(20))],
            51,
        );
        // leftmost of the two widest loses the single character
        assert_eq!(layout.widths, vec![5, 22, 23]);
    }

    #[test]
    fn test_width_budget_for_many_terminal_widths() {
        let batch: Vec<Record> = (0..6)
            .map(|i| {
                Record::new()
                    .with("id", i)
                    .with("description", "z".repeat(10 + i as usize * 7))
                    .with("project", "home")
                    .with("urgency", Value::Float(1.25 * i as f64))
            })
            .collect();
        for width in 5..160 {
            let (layout, _) = layout_for(batch.clone(), width);
            assert!(layout.total() < width, "width {}: {:?}", width, layout);
            assert!(layout.widths.iter().all(|&w| w >= 1));
        }
    }

    #[test]
    fn test_degraded_when_columns_cannot_fit() {
        let (layout, _) = layout_for(
            vec![Record::new().with("id", 1).with("a", "x").with("b", "y")],
            2,
        );
        assert!(layout.degraded);
        assert_eq!(layout.widths, vec![1, 1, 1]);
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abcdefg", 10), "abcdefg");
    }

    #[test]
    fn test_truncate_law() {
        let width = 10;
        for len in 8..30 {
            let text = "x".repeat(len);
            let out = truncate(&text, width);
            assert_eq!(out, format!("{}...", "x".repeat(width - 6)));
            assert_eq!(out.len(), width - 3);
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("ééééééééé", 10), "éééé...");
        assert_eq!(truncate("anything", 3), "...");
    }
}
