//! ScrollAnchor - the bottom-tracking heuristic for the feed viewport.
//!
//! Row-based: one layout unit is one terminal row. `capture` reads the last
//! measured geometry before any mutation; `restore` is deferred because the
//! content height is only final after the newly attached batch has been
//! measured. Restores therefore record a pending bottom target resolved at
//! the next measure, then re-apply once more after a short fixed delay to
//! cover hosts whose first application is lost to a late reflow.

use std::time::Duration;
use tracing::trace;

/// Rows of tolerance for "effectively at the bottom"
pub const BOTTOM_SLACK_ROWS: usize = 50;

/// Delay before the one-shot re-application of a bottom restore
pub const RESTORE_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct ScrollAnchor {
    /// Rows scrolled away from the top of the content
    offset: usize,
    /// Content height at the last measure
    content_height: usize,
    /// Viewport height at the last measure
    viewport_height: u16,
    /// Whether the viewer has manually scrolled away from the bottom
    user_scrolled: bool,
    /// Bottom target to resolve at the next measure
    pending_bottom: bool,
    /// Countdown to the compatibility re-application
    retry_in: Option<Duration>,
}

impl Default for ScrollAnchor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollAnchor {
    pub fn new() -> Self {
        Self {
            offset: 0,
            content_height: 0,
            viewport_height: 0,
            user_scrolled: false,
            pending_bottom: false,
            retry_in: None,
        }
    }

    /// At-bottom heuristic over the last measured geometry. Must be read
    /// before the reconciler mutates anything.
    pub fn capture(&self) -> bool {
        if self.content_height == 0 || self.viewport_height == 0 {
            return true;
        }
        if !self.user_scrolled {
            return true;
        }
        self.offset + usize::from(self.viewport_height) + BOTTOM_SLACK_ROWS >= self.content_height
    }

    /// Queue a scroll to the maximum offset, resolved once the next layout
    /// pass has measured the attached batch. No-op when `should_scroll` is
    /// false so an out-of-band viewer keeps their position.
    pub fn restore(&mut self, should_scroll: bool) {
        if !should_scroll {
            return;
        }
        self.pending_bottom = true;
        self.retry_in = Some(RESTORE_RETRY_DELAY);
        trace!(target: "feedline.scroll", "bottom restore queued");
    }

    /// Advance the retry timer; fires the one-shot re-application
    pub fn tick(&mut self, elapsed: Duration) {
        if let Some(remaining) = self.retry_in {
            if remaining <= elapsed {
                self.retry_in = None;
                self.pending_bottom = true;
                trace!(target: "feedline.scroll", "bottom restore re-applied");
            } else {
                self.retry_in = Some(remaining - elapsed);
            }
        }
    }

    /// Record the post-layout geometry and resolve any pending target.
    /// Called once per frame after row heights are known.
    pub(crate) fn measure(&mut self, content_height: usize, viewport_height: u16) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        let max_offset = content_height.saturating_sub(usize::from(viewport_height));
        if self.pending_bottom {
            self.pending_bottom = false;
            self.offset = max_offset;
            self.user_scrolled = false;
        }
        self.offset = self.offset.min(max_offset);
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_at_bottom(&self) -> bool {
        self.capture()
    }

    pub fn scroll_up(&mut self, rows: usize) -> bool {
        self.pending_bottom = false;
        let previous = self.offset;
        self.offset = self.offset.saturating_sub(rows);
        if self.offset == previous {
            return false;
        }
        self.user_scrolled = true;
        true
    }

    pub fn scroll_down(&mut self, rows: usize) -> bool {
        self.pending_bottom = false;
        let previous = self.offset;
        let max_offset = self
            .content_height
            .saturating_sub(usize::from(self.viewport_height));
        self.offset = self.offset.saturating_add(rows).min(max_offset);
        if self.offset == previous {
            return false;
        }
        self.user_scrolled = true;
        true
    }

    pub fn scroll_to_top(&mut self) {
        self.pending_bottom = false;
        self.offset = 0;
        self.user_scrolled = true;
    }

    /// Forget everything; used when the feed empties
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}
