#![forbid(unsafe_code)]

//! Windowed rendering math for long option lists.
//!
//! Only rows whose interval intersects the scroll window are laid out:
//!
//! ```text
//! start = floor(scroll_top / row_height)
//! end   = min(total, start + ceil(viewport_height / row_height) + overscan)
//! ```
//!
//! Units are abstract (terminal cells for a TUI host, pixels for others);
//! only their ratios matter. All rows share one height.

use std::ops::Range;

/// Where [`VirtualListState::scroll_to_item`] places the target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAlign {
    /// No-op if the row is fully visible, otherwise the minimal scroll.
    #[default]
    Smart,
    /// Row at the top edge.
    Start,
    /// Row at the bottom edge.
    End,
    /// Row centered in the viewport.
    Center,
}

/// A laid-out row, positioned relative to the viewport top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    /// Index into the filtered option array.
    pub index: usize,
    /// Offset of the row's top edge from the viewport top. Negative for a
    /// row partially scrolled off the top.
    pub top: i64,
    /// Row height.
    pub height: usize,
}

/// Scroll position and viewport geometry for one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualListState {
    scroll_top: usize,
    viewport_height: usize,
    row_height: usize,
    overscan: usize,
}

impl Default for VirtualListState {
    fn default() -> Self {
        Self::new(1, 8)
    }
}

impl VirtualListState {
    /// Create with the given row and viewport heights. A zero row height is
    /// treated as one.
    #[must_use]
    pub fn new(row_height: usize, viewport_height: usize) -> Self {
        Self {
            scroll_top: 0,
            viewport_height,
            row_height: row_height.max(1),
            overscan: 2,
        }
    }

    /// Set the number of extra rows laid out below the window.
    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Current scroll offset.
    #[must_use]
    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    /// Viewport height.
    #[must_use]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    /// Row height.
    #[must_use]
    pub fn row_height(&self) -> usize {
        self.row_height
    }

    /// Overscan rows.
    #[must_use]
    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Whole rows that fit in the viewport (at least one).
    #[must_use]
    pub fn page_rows(&self) -> usize {
        (self.viewport_height / self.row_height).max(1)
    }

    /// Total content height for `total` rows.
    #[must_use]
    pub fn content_height(&self, total: usize) -> usize {
        total.saturating_mul(self.row_height)
    }

    /// Largest valid scroll offset.
    #[must_use]
    pub fn max_scroll(&self, total: usize) -> usize {
        self.content_height(total)
            .saturating_sub(self.viewport_height)
    }

    /// Indices of rows to lay out.
    #[must_use]
    pub fn visible_range(&self, total: usize) -> Range<usize> {
        if total == 0 {
            return 0..0;
        }
        let start = (self.scroll_top / self.row_height).min(total);
        let count = self.viewport_height.div_ceil(self.row_height) + self.overscan;
        start..start.saturating_add(count).min(total)
    }

    /// Lay out the visible rows.
    pub fn rows(&self, total: usize) -> impl Iterator<Item = RowSlot> + '_ {
        let scroll_top = self.scroll_top as i64;
        let height = self.row_height;
        self.visible_range(total).map(move |index| RowSlot {
            index,
            top: (index * height) as i64 - scroll_top,
            height,
        })
    }

    /// Row under a viewport-relative offset, if any.
    #[must_use]
    pub fn row_at(&self, offset: usize, total: usize) -> Option<usize> {
        if offset >= self.viewport_height {
            return None;
        }
        let index = (self.scroll_top + offset) / self.row_height;
        (index < total).then_some(index)
    }

    /// Whether row `index` lies entirely inside the viewport.
    #[must_use]
    pub fn is_fully_visible(&self, index: usize) -> bool {
        let top = index.saturating_mul(self.row_height);
        let bottom = top.saturating_add(self.row_height);
        top >= self.scroll_top && bottom <= self.scroll_top + self.viewport_height
    }

    /// Scroll so row `index` is visible according to `align`.
    ///
    /// Returns `true` if the offset changed.
    pub fn scroll_to_item(&mut self, index: usize, total: usize, align: ScrollAlign) -> bool {
        if total == 0 {
            return self.set_scroll_top(0, total);
        }
        let index = index.min(total - 1);
        let top = index * self.row_height;
        let bottom = top + self.row_height;
        let target = match align {
            ScrollAlign::Smart => {
                if self.is_fully_visible(index) {
                    return false;
                }
                if top < self.scroll_top || self.row_height > self.viewport_height {
                    top
                } else {
                    bottom.saturating_sub(self.viewport_height)
                }
            }
            ScrollAlign::Start => top,
            ScrollAlign::End => bottom.saturating_sub(self.viewport_height),
            ScrollAlign::Center => (top + self.row_height / 2).saturating_sub(self.viewport_height / 2),
        };
        self.set_scroll_top(target, total)
    }

    /// Scroll by whole rows (positive is down).
    pub fn scroll_rows(&mut self, delta: i64, total: usize) -> bool {
        let delta_units = delta.saturating_mul(self.row_height as i64);
        let target = (self.scroll_top as i64).saturating_add(delta_units).max(0) as usize;
        self.set_scroll_top(target, total)
    }

    /// Set the raw scroll offset, clamped to the content.
    pub fn set_scroll_top(&mut self, scroll_top: usize, total: usize) -> bool {
        let clamped = scroll_top.min(self.max_scroll(total));
        let changed = clamped != self.scroll_top;
        self.scroll_top = clamped;
        changed
    }

    /// Reset to the top.
    pub fn scroll_to_top(&mut self) {
        self.scroll_top = 0;
    }

    /// Change the viewport height and re-clamp.
    pub fn resize(&mut self, viewport_height: usize, total: usize) {
        self.viewport_height = viewport_height;
        self.clamp(total);
    }

    /// Re-clamp after the row count changed.
    pub fn clamp(&mut self, total: usize) {
        self.scroll_top = self.scroll_top.min(self.max_scroll(total));
    }
}
