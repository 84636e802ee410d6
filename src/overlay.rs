// Overlay interaction state
// Tracks the size percentage and drag state, independent of any Wayland types

/// Minimum size percentage; decreases clamp here, never lower.
pub const MIN_PERCENT: u32 = 10;

/// Size adjustment step for the scroll wheel.
pub const SCROLL_STEP: i32 = 5;

/// Size adjustment step for the +/- keys.
pub const KEY_STEP: i32 = 10;

/// Default size percentage at startup.
const DEFAULT_PERCENT: u32 = 100;

/// Mutable overlay state, owned by the window and only ever touched from the
/// event dispatch thread.
#[derive(Debug)]
pub struct OverlayState {
    /// Current size as a percentage of the source image (>= 10, no ceiling)
    size_percent: u32,
    /// Whether a primary-button drag is in progress
    dragging: bool,
    /// Pointer position at drag start, window-relative
    drag_start_pos: (f64, f64),
    /// Window margins at drag start
    drag_start_margin: (i32, i32),
    /// Window position as margins from the output's top-left corner
    pub margin_left: i32,
    pub margin_top: i32,
}

impl OverlayState {
    pub fn new() -> Self {
        Self {
            size_percent: DEFAULT_PERCENT,
            dragging: false,
            drag_start_pos: (0.0, 0.0),
            drag_start_margin: (0, 0),
            margin_left: 0,
            margin_top: 0,
        }
    }

    pub fn size_percent(&self) -> u32 {
        self.size_percent
    }

    pub fn dragging(&self) -> bool {
        self.dragging
    }

    /// Adjust the size percentage by `delta`, clamping at the minimum.
    /// Returns true when the value actually changed, so the caller knows
    /// whether to rescale and redraw.
    pub fn adjust(&mut self, delta: i32) -> bool {
        let target = self.size_percent as i64 + delta as i64;
        let new_percent = target.max(MIN_PERCENT as i64) as u32;
        if new_percent != self.size_percent {
            self.size_percent = new_percent;
            true
        } else {
            false
        }
    }

    /// Begin a drag, anchoring the pointer position and current margins.
    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.dragging = true;
        self.drag_start_pos = (x, y);
        self.drag_start_margin = (self.margin_left, self.margin_top);
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Compute new margins for a pointer motion event. Returns `None` when no
    /// drag is in progress; the caller applies the returned margins to the
    /// surface and stores them back here.
    pub fn drag_motion(&mut self, x: f64, y: f64) -> Option<(i32, i32)> {
        if !self.dragging {
            return None;
        }

        let dx = x - self.drag_start_pos.0;
        let dy = y - self.drag_start_pos.1;

        self.margin_left = self.drag_start_margin.0 + dx as i32;
        self.margin_top = self.drag_start_margin.1 + dy as i32;

        Some((self.margin_left, self.margin_top))
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_default_size() {
        let state = OverlayState::new();
        assert_eq!(state.size_percent(), 100);
        assert!(!state.dragging());
    }

    #[test]
    fn scroll_up_increases_by_step() {
        let mut state = OverlayState::new();
        assert!(state.adjust(SCROLL_STEP));
        assert_eq!(state.size_percent(), 105);
    }

    #[test]
    fn scroll_down_clamps_at_minimum() {
        let mut state = OverlayState::new();
        state.size_percent = 12;
        assert!(state.adjust(-SCROLL_STEP));
        assert_eq!(state.size_percent(), 10);
    }

    #[test]
    fn adjust_at_floor_reports_no_change() {
        let mut state = OverlayState::new();
        state.size_percent = MIN_PERCENT;
        assert!(!state.adjust(-SCROLL_STEP));
        assert!(!state.adjust(-KEY_STEP));
        assert_eq!(state.size_percent(), MIN_PERCENT);
    }

    #[test]
    fn five_key_decreases_halve_the_size() {
        let mut state = OverlayState::new();
        for _ in 0..5 {
            state.adjust(-KEY_STEP);
        }
        assert_eq!(state.size_percent(), 50);
    }

    #[test]
    fn size_has_no_ceiling() {
        let mut state = OverlayState::new();
        for _ in 0..1000 {
            state.adjust(KEY_STEP);
        }
        assert_eq!(state.size_percent(), 100 + 1000 * KEY_STEP as u32);
    }

    #[test]
    fn drag_accumulates_pointer_deltas() {
        let mut state = OverlayState::new();
        state.margin_left = 100;
        state.margin_top = 200;

        state.begin_drag(50.0, 60.0);
        assert_eq!(state.drag_motion(55.0, 58.0), Some((105, 198)));
        assert_eq!(state.drag_motion(70.0, 90.0), Some((120, 230)));
        state.end_drag();

        assert_eq!((state.margin_left, state.margin_top), (120, 230));
    }

    #[test]
    fn press_position_is_the_anchor() {
        // Motion at the press position itself must not move the window;
        // any displacement there means the anchor was stale.
        let mut state = OverlayState::new();
        state.margin_left = 30;
        state.margin_top = 40;

        state.begin_drag(80.0, 90.0);
        assert_eq!(state.drag_motion(80.0, 90.0), Some((30, 40)));
    }

    #[test]
    fn motion_without_drag_moves_nothing() {
        let mut state = OverlayState::new();
        state.margin_left = 100;
        state.margin_top = 200;

        assert_eq!(state.drag_motion(500.0, 500.0), None);
        assert_eq!((state.margin_left, state.margin_top), (100, 200));
    }

    #[test]
    fn drag_after_release_needs_new_anchor() {
        let mut state = OverlayState::new();
        state.begin_drag(10.0, 10.0);
        state.drag_motion(20.0, 20.0);
        state.end_drag();
        assert_eq!(state.drag_motion(100.0, 100.0), None);
    }
}
