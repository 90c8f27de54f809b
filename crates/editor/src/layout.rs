//! Geometry of the horizontal timeline strip.
//!
//! Clips are laid out left to right in timeline order as equal-width slots
//! separated by a gap. Content coordinates start at the first clip's left
//! edge; viewport coordinates subtract the scroll offset.

use montage_common::config::EditorDefaults;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineLayout {
    clip_width: f64,
    gap: f64,
    viewport_width: f64,
    scroll_offset: f64,
}

impl Default for TimelineLayout {
    fn default() -> Self {
        Self::new(160.0, 8.0, 1280.0)
    }
}

impl TimelineLayout {
    pub fn new(clip_width: f64, gap: f64, viewport_width: f64) -> Self {
        Self {
            clip_width: clip_width.max(1.0),
            gap: gap.max(0.0),
            viewport_width: viewport_width.max(1.0),
            scroll_offset: 0.0,
        }
    }

    pub fn from_config(config: &EditorDefaults, viewport_width: f64) -> Self {
        Self::new(config.clip_width_px, config.clip_gap_px, viewport_width)
    }

    fn stride(&self) -> f64 {
        self.clip_width + self.gap
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    /// Left edge of slot `index` in content coordinates.
    pub fn slot_left(&self, index: usize) -> f64 {
        index as f64 * self.stride()
    }

    /// Horizontal midpoint of slot `index` in viewport coordinates.
    pub fn midpoint(&self, index: usize) -> f64 {
        self.slot_left(index) + self.clip_width / 2.0 - self.scroll_offset
    }

    pub fn content_width(&self, len: usize) -> f64 {
        if len == 0 {
            return 0.0;
        }
        self.slot_left(len - 1) + self.clip_width
    }

    pub fn max_scroll(&self, len: usize) -> f64 {
        (self.content_width(len) - self.viewport_width).max(0.0)
    }

    /// Store a new scroll position, clamped to the scrollable range.
    pub fn set_scroll_offset(&mut self, offset: f64, len: usize) -> f64 {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        self.scroll_offset = offset.clamp(0.0, self.max_scroll(len));
        self.scroll_offset
    }

    /// Clip slot under viewport position `x`; gaps and empty space miss.
    pub fn hit_test(&self, x: f64, len: usize) -> Option<usize> {
        let content_x = x + self.scroll_offset;
        if content_x < 0.0 {
            return None;
        }
        let index = (content_x / self.stride()).floor() as usize;
        let within = content_x - self.slot_left(index) < self.clip_width;
        (index < len && within).then_some(index)
    }

    /// Clip whose left edge is closest to the viewport's left edge.
    pub fn nearest_to_left_edge(&self, len: usize) -> Option<usize> {
        (0..len).min_by(|&a, &b| {
            let da = (self.slot_left(a) - self.scroll_offset).abs();
            let db = (self.slot_left(b) - self.scroll_offset).abs();
            da.total_cmp(&db)
        })
    }

    /// Index the dragged clip should move to for a pointer at viewport
    /// position `pointer_x`: the position of the first other clip whose
    /// midpoint lies right of the pointer, or the end when there is none.
    pub fn insertion_index(&self, pointer_x: f64, dragged: usize, len: usize) -> usize {
        (0..len)
            .filter(|&i| i != dragged)
            .position(|i| self.midpoint(i) > pointer_x)
            .unwrap_or(len.saturating_sub(1))
    }

    /// Scroll offset that centers slot `index` in the viewport.
    pub fn scroll_into_view(&self, index: usize, len: usize) -> f64 {
        let centered = self.slot_left(index) + self.clip_width / 2.0 - self.viewport_width / 2.0;
        centered.clamp(0.0, self.max_scroll(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> TimelineLayout {
        // Slots at 0..100, 110..210, 220..320, ...
        TimelineLayout::new(100.0, 10.0, 250.0)
    }

    #[test]
    fn test_hit_test_skips_gaps() {
        let l = layout();
        assert_eq!(l.hit_test(50.0, 3), Some(0));
        assert_eq!(l.hit_test(105.0, 3), None);
        assert_eq!(l.hit_test(115.0, 3), Some(1));
        assert_eq!(l.hit_test(400.0, 3), None);
        assert_eq!(l.hit_test(-1.0, 3), None);
    }

    #[test]
    fn test_hit_test_accounts_for_scroll() {
        let mut l = layout();
        l.set_scroll_offset(110.0, 5);
        assert_eq!(l.hit_test(5.0, 5), Some(1));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut l = layout();
        assert_eq!(l.max_scroll(3), 70.0);
        assert_eq!(l.set_scroll_offset(500.0, 3), 70.0);
        assert_eq!(l.set_scroll_offset(-5.0, 3), 0.0);
    }

    #[test]
    fn test_nearest_to_left_edge() {
        let mut l = layout();
        l.set_scroll_offset(160.0, 6);
        // Slot 1 starts 50 px left of the edge, slot 2 60 px right of it.
        assert_eq!(l.nearest_to_left_edge(6), Some(1));
        l.set_scroll_offset(170.0, 6);
        assert_eq!(l.nearest_to_left_edge(6), Some(2));
        assert_eq!(l.nearest_to_left_edge(0), None);
    }

    #[test]
    fn test_insertion_index() {
        let l = layout();
        // Midpoints: 50, 160, 270, 380.
        assert_eq!(l.insertion_index(0.0, 3, 4), 0);
        assert_eq!(l.insertion_index(100.0, 0, 4), 0);
        assert_eq!(l.insertion_index(200.0, 0, 4), 1);
        assert_eq!(l.insertion_index(1000.0, 0, 4), 3);
    }

    #[test]
    fn test_scroll_into_view_centers() {
        let l = layout();
        // Slot 2 center is 270; viewport half is 125.
        assert_eq!(l.scroll_into_view(2, 10), 145.0);
        assert_eq!(l.scroll_into_view(0, 10), 0.0);
        assert_eq!(l.scroll_into_view(9, 10), l.max_scroll(10));
    }
}
