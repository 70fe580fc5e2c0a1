//! Follow-the-tail scroll policy for a growing log view.
//!
//! The view sticks to the newest line until the user scrolls more than
//! `threshold_px` away from the bottom, and resumes once they come back
//! within it. The decision is re-made on every append.

/// Geometry of a scrollable view, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_height: u32,
    pub scroll_top: u32,
    pub client_height: u32,
}

impl Viewport {
    /// Distance between the visible bottom edge and the end of content.
    pub fn distance_from_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
    }

    /// Scroll offset that shows the last line.
    pub fn bottom_offset(&self) -> u32 {
        self.scroll_height.saturating_sub(self.client_height)
    }
}

#[derive(Debug, Clone)]
pub struct ScrollFollower {
    threshold_px: u32,
    following: bool,
}

impl ScrollFollower {
    pub fn new(threshold_px: u32) -> Self {
        Self {
            threshold_px,
            following: true,
        }
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Record a user scroll.
    pub fn on_user_scroll(&mut self, viewport: Viewport) {
        self.following = viewport.distance_from_bottom() < self.threshold_px;
    }

    /// Lines were appended; returns the offset to scroll to, if any.
    pub fn on_append(&self, viewport: Viewport) -> Option<u32> {
        self.following.then(|| viewport.bottom_offset())
    }
}

impl Default for ScrollFollower {
    fn default() -> Self {
        Self::new(40)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(scroll_height: u32, scroll_top: u32) -> Viewport {
        Viewport {
            scroll_height,
            scroll_top,
            client_height: 200,
        }
    }

    #[test]
    fn pinned_without_user_scroll() {
        let follower = ScrollFollower::new(40);
        let mut height = 200;
        for _ in 0..50 {
            height += 18;
            assert_eq!(follower.on_append(vp(height, 0)), Some(height - 200));
        }
    }

    #[test]
    fn scroll_away_stops_following_until_return() {
        let mut follower = ScrollFollower::new(40);

        follower.on_user_scroll(vp(1000, 500));
        assert!(!follower.is_following());
        assert_eq!(follower.on_append(vp(1018, 500)), None);
        assert_eq!(follower.on_append(vp(1036, 500)), None);

        follower.on_user_scroll(vp(1036, 800));
        assert!(follower.is_following());
        assert_eq!(follower.on_append(vp(1054, 800)), Some(854));
    }

    #[test]
    fn small_drift_keeps_following() {
        let mut follower = ScrollFollower::new(40);
        follower.on_user_scroll(vp(1000, 770));
        assert!(follower.is_following());
        follower.on_user_scroll(vp(1000, 760));
        assert!(!follower.is_following());
    }
}
