//! Vertical scroll position over a list of laid-out rows.

use std::ops::Range;

/// Scroll position of a viewport over `total_rows` rows.
///
/// Every operation leaves `offset` within `0..=max_offset()`, so the viewport
/// never starts past the last full page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
    total_rows: usize,
    viewport_height: usize,
}

impl ScrollState {
    pub fn new(total_rows: usize, viewport_height: usize) -> Self {
        Self {
            offset: 0,
            total_rows,
            viewport_height,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    /// Largest valid offset. Zero when everything fits.
    pub fn max_offset(&self) -> usize {
        self.total_rows.saturating_sub(self.viewport_height)
    }

    fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Move by `delta` rows, stopping at either end.
    pub fn scroll_by(&mut self, delta: isize) {
        self.offset = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.clamp();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Jump to `offset`, clamped. Used to restore a remembered position.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
        self.clamp();
    }

    pub fn on_resize(&mut self, viewport_height: usize) {
        self.viewport_height = viewport_height;
        self.clamp();
    }

    /// The rows were laid out again; keep the offset if it is still valid.
    pub fn on_content_change(&mut self, total_rows: usize) {
        self.total_rows = total_rows;
        self.clamp();
    }

    /// Row indices currently on screen.
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.offset.min(self.total_rows);
        let len = self.viewport_height.min(self.total_rows - start);
        start..start + len
    }

    /// Rows moved by a half-page command. At least one.
    pub fn half_page(&self) -> isize {
        isize::try_from((self.viewport_height / 2).max(1)).unwrap_or(isize::MAX)
    }

    /// Rows moved by a full-page command. At least one.
    pub fn page(&self) -> isize {
        isize::try_from(self.viewport_height.max(1)).unwrap_or(isize::MAX)
    }
}
