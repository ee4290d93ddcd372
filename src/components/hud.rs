//! Dashboard painter
//!
//! Draws the title bar, extra info footer, column header and record rows
//! straight into the frame buffer. Nothing is cached between frames: widths
//! and positions are recomputed from the store and viewport every time.

use super::layout::{compute_widths, text_len, truncate, ColumnLayout};
use crate::model::view::HEADER_ROWS;
use crate::model::{ColumnSet, RecordStore, ViewState};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};
use tracing::trace;

/// First header row, directly below the title bar
const HEADER_TOP: u16 = 1;

/// Left padding of text inside a column
const CELL_INDENT: usize = 2;

/// Everything the painter reads for one frame
pub struct Hud<'a> {
    pub title: &'a str,
    pub store: &'a RecordStore,
    pub columns: &'a ColumnSet,
    pub view: &'a ViewState,
}

impl Widget for Hud<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let layout = compute_widths(self.store.records(), self.columns, area.width as usize);
        if layout.degraded {
            trace!(widths = ?layout.widths, width = area.width, "columns do not fit terminal");
        }

        self.render_title(area, buf);
        self.render_footer(area, buf);
        self.render_header(area, buf, &layout);
        self.render_body(area, buf, &layout);
    }
}

impl Hud<'_> {
    fn render_title(&self, area: Rect, buf: &mut Buffer) {
        let padded = format!("{:<width$}", self.title, width = area.width as usize);
        put(buf, area, 0, 0, &padded, reversed());
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let footer_height = self.view.footer_height;
        if footer_height == 0 || footer_height > area.height {
            return;
        }
        let width = area.width as usize;
        let rule_row = area.height - footer_height;

        put(buf, area, 0, rule_row, &"─".repeat(width), border());
        for row in rule_row + 1..area.height {
            put(buf, area, 0, row, &" ".repeat(width), Style::default());
        }

        let Some(record) = self.store.get(self.view.selectpos) else {
            return;
        };

        let mut col = 0;
        let mut line = 0;
        for field in self.columns.extra_info() {
            let Some(value) = record.get(field) else {
                continue;
            };
            let token = format!("{}: {}, ", field, self.columns.display(field, value));
            let len = text_len(&token);
            if col > 0 && col + len >= width {
                col = 0;
                line += 1;
            }
            let row = rule_row as usize + 1 + line;
            if row >= area.height as usize {
                break;
            }
            put(buf, area, col, row as u16, &token, Style::default());
            col += len;
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer, layout: &ColumnLayout) {
        let width = area.width as usize;
        let blank = " ".repeat(width);
        put(buf, area, 0, HEADER_TOP, &blank, Style::default());
        put(buf, area, 0, HEADER_TOP + 1, &blank, Style::default());

        let title_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        for (index, column) in self.columns.main().iter().enumerate() {
            let start = layout.column_start(index);
            let col_width = layout.widths[index];

            put(buf, area, start, HEADER_TOP, "│", border());
            put(buf, area, start, HEADER_TOP + 1, "│", border());
            put(
                buf,
                area,
                start + CELL_INDENT,
                HEADER_TOP + 1,
                &truncate(column, col_width),
                title_style,
            );
            let underline = format!("┴{}", "─".repeat(col_width.saturating_sub(1)));
            put(buf, area, start, HEADER_TOP + 2, &underline, border());
        }

        let end = layout.total();
        put(buf, area, 0, HEADER_TOP + 2, "└", border());
        put(buf, area, end, HEADER_TOP, "│", border());
        put(buf, area, end, HEADER_TOP + 1, "│", border());
        put(buf, area, end, HEADER_TOP + 2, "┘", border());
    }

    fn render_body(&self, area: Rect, buf: &mut Buffer, layout: &ColumnLayout) {
        let body_top = HEADER_TOP + HEADER_ROWS;
        let blank = " ".repeat(area.width as usize);
        let rows = self
            .store
            .records()
            .iter()
            .enumerate()
            .skip(self.view.scrollpos)
            .take(self.view.visible_rows());

        for (offset, (index, record)) in rows.enumerate() {
            let Ok(row) = u16::try_from(offset) else {
                break;
            };
            let row = body_top.saturating_add(row);
            let style = if index == self.view.selectpos {
                reversed()
            } else {
                Style::default()
            };

            put(buf, area, 0, row, &blank, style);
            for (col_index, column) in self.columns.main().iter().enumerate() {
                let Some(value) = record.get(column) else {
                    continue;
                };
                let text = self.columns.display(column, value);
                put(
                    buf,
                    area,
                    layout.column_start(col_index) + CELL_INDENT,
                    row,
                    &truncate(&text, layout.widths[col_index]),
                    style,
                );
            }
        }
    }
}

fn reversed() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

fn border() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Write `text` at (`x`, `y`) relative to `area`, clipped to the area
fn put(buf: &mut Buffer, area: Rect, x: usize, y: u16, text: &str, style: Style) {
    let Ok(x) = u16::try_from(x) else {
        return;
    };
    if x >= area.width || y >= area.height {
        return;
    }
    let max_width = (area.width - x) as usize;
    buf.set_stringn(area.x + x, area.y + y, text, max_width, style);
}
