//! Viewport state - scroll offset, selection and terminal size
//!
//! Every movement keeps `scrollpos <= selectpos < scrollpos + visible_rows()`
//! and, when there are records, `selectpos < record_count`.

/// Rows taken by the header (two title rows and a border row)
pub const HEADER_ROWS: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    /// Index of the first visible record
    pub scrollpos: usize,
    /// Index of the highlighted record
    pub selectpos: usize,
    pub width: u16,
    pub height: u16,
    /// Height of the extra info panel including its rule
    pub footer_height: u16,
}

impl ViewState {
    pub fn new(width: u16, height: u16, footer_height: u16) -> Self {
        Self {
            scrollpos: 0,
            selectpos: 0,
            width,
            height,
            footer_height,
        }
    }

    /// Number of body rows: terminal height minus header and footer
    pub fn visible_rows(&self) -> usize {
        self.height
            .saturating_sub(HEADER_ROWS)
            .saturating_sub(self.footer_height) as usize
    }

    /// Body rows used for scrolling decisions; never zero
    fn page(&self) -> usize {
        self.visible_rows().max(1)
    }

    /// Record new terminal dimensions. Scroll and selection are left as they are.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    pub fn select_prev(&mut self) {
        self.selectpos = self.selectpos.saturating_sub(1);
        if self.selectpos < self.scrollpos {
            self.scrollpos -= 1;
        }
    }

    pub fn select_next(&mut self, record_count: usize) {
        self.selectpos = (self.selectpos + 1).min(record_count.saturating_sub(1));
        if self.selectpos >= self.scrollpos + self.page() {
            self.scrollpos += 1;
        }
    }

    pub fn page_up(&mut self) {
        for _ in 0..self.page() {
            self.select_prev();
        }
    }

    pub fn page_down(&mut self, record_count: usize) {
        for _ in 0..self.page() {
            self.select_next(record_count);
        }
    }

    pub fn select_first(&mut self) {
        self.selectpos = 0;
        self.scrollpos = 0;
    }

    pub fn select_last(&mut self, record_count: usize) {
        self.selectpos = record_count.saturating_sub(1);
        let page = self.page();
        if self.selectpos >= self.scrollpos + page {
            self.scrollpos = self.selectpos + 1 - page;
        }
    }
}
