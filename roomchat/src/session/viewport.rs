//! Viewport tracking: auto-scroll versus the unread affordance.
//!
//! Tracks whether the end-of-conversation marker is inside the visible
//! area of the rendering surface. New content auto-scrolls the view only
//! while the reader is at the bottom (or when a scroll is forced); when the
//! reader has scrolled away, the unread flag is raised instead and the
//! scroll position is left alone.
//!
//! Geometry is line-based: the surface reports its height in rows, content
//! height is the number of rendered lines, and the scroll offset is the
//! index of the first visible line.

/// Tracks scroll position, follow-bottom state, and the unread flag.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    /// Height of the visible area in rows. Zero until mounted.
    viewport_height: usize,
    /// Total rendered content height in rows.
    content_height: usize,
    /// Index of the first visible row.
    offset: usize,
    /// Whether the rendering surface has been attached yet.
    mounted: bool,
    /// Whether content has arrived below the fold.
    unread: bool,
}

impl ViewportTracker {
    /// Create a tracker with no surface attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or re-attach) the rendering surface with its height in rows.
    ///
    /// Idempotent: rendering surfaces report their geometry on every
    /// layout pass, so repeated mounts only update the height.
    pub fn mount(&mut self, viewport_height: usize) {
        self.mounted = true;
        self.viewport_height = viewport_height;
        self.clamp_offset();
    }

    /// Whether the end-of-list marker is within the visible area.
    ///
    /// Content that fits entirely in the viewport counts as at-bottom.
    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.offset + self.viewport_height >= self.content_height
    }

    /// Apply new content and decide between auto-scroll and unread badge.
    ///
    /// When the reader was at the bottom before the content arrived, or
    /// `force_scroll` is set (initial room load, a self-sent message, or
    /// activating the unread affordance), the view scrolls to the bottom
    /// and the unread flag clears. Otherwise the unread flag is raised and
    /// the scroll position stays untouched.
    ///
    /// A no-op before the surface is mounted.
    pub fn notify_new_content(&mut self, content_height: usize, force_scroll: bool) {
        if !self.mounted {
            return;
        }
        let was_at_bottom = self.is_at_bottom();
        self.content_height = content_height;

        if force_scroll || was_at_bottom {
            self.scroll_to_bottom();
        } else {
            self.unread = true;
        }
    }

    /// Manual scroll by a signed number of rows.
    ///
    /// Landing exactly at the bottom edge clears the unread flag, whether
    /// or not new content arrived in the meantime.
    pub fn scroll_by(&mut self, delta: isize) {
        if !self.mounted {
            return;
        }
        self.offset = self.offset.saturating_add_signed(delta);
        self.clamp_offset();
        if self.is_at_bottom() {
            self.unread = false;
        }
    }

    /// Jump to the bottom and clear the unread flag.
    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.content_height.saturating_sub(self.viewport_height);
        self.unread = false;
    }

    /// Forget the previous room's geometry. The mount state is kept: the
    /// surface is still attached, only the content is gone.
    pub fn reset(&mut self) {
        self.content_height = 0;
        self.offset = 0;
        self.unread = false;
    }

    /// Whether content has arrived below the fold.
    #[must_use]
    pub const fn has_unread(&self) -> bool {
        self.unread
    }

    /// Index of the first visible row.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Whether a rendering surface is attached.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn clamp_offset(&mut self) {
        let max = self.content_height.saturating_sub(self.viewport_height);
        if self.offset > max {
            self.offset = max;
        }
    }
}
