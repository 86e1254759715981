/// Leftmost position the boundary may take, in percent.
pub const MIN_PERCENT: f64 = 5.0;
/// Rightmost position the boundary may take, in percent.
pub const MAX_PERCENT: f64 = 95.0;
/// Where the boundary sits when a comparison starts.
pub const DEFAULT_PERCENT: f64 = 50.0;

/// The draggable split of the comparison view: the enhanced photo shows
/// left of the boundary, the untouched one right of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealBoundary(f64);

impl Default for RevealBoundary {
    fn default() -> Self {
        Self(DEFAULT_PERCENT)
    }
}

impl RevealBoundary {
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Move to `percent`, clamped. Non-finite input is ignored.
    pub fn set(&mut self, percent: f64) -> f64 {
        if percent.is_finite() {
            self.0 = percent.clamp(MIN_PERCENT, MAX_PERCENT);
        }
        self.0
    }

    /// Follow a pointer at `pointer_x` over a container starting at `left`
    /// and `width` wide, all in the same units.
    pub fn track(&mut self, pointer_x: f64, left: f64, width: f64) -> f64 {
        if !(width.is_finite() && width > 0.0) {
            return self.0;
        }
        self.set((pointer_x - left) / width * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_centered() {
        assert_eq!(RevealBoundary::default().percent(), 50.0);
    }

    #[test]
    fn track_maps_pointer_to_percent() {
        let mut b = RevealBoundary::default();
        assert_eq!(b.track(300.0, 100.0, 800.0), 25.0);
    }

    #[test]
    fn track_clamps_outside_container() {
        let mut b = RevealBoundary::default();
        assert_eq!(b.track(-500.0, 100.0, 800.0), MIN_PERCENT);
        assert_eq!(b.track(5000.0, 100.0, 800.0), MAX_PERCENT);
        assert_eq!(b.track(100.0, 100.0, 800.0), MIN_PERCENT);
        assert_eq!(b.track(900.0, 100.0, 800.0), MAX_PERCENT);
    }

    #[test]
    fn clamps_over_a_sweep() {
        let mut b = RevealBoundary::default();
        let mut x = -2000.0;
        while x <= 2000.0 {
            let p = b.track(x, 0.0, 640.0);
            assert!((MIN_PERCENT..=MAX_PERCENT).contains(&p), "{p} out of range at x={x}");
            x += 17.5;
        }
    }

    #[test]
    fn degenerate_width_keeps_position() {
        let mut b = RevealBoundary::default();
        b.set(30.0);
        assert_eq!(b.track(10.0, 0.0, 0.0), 30.0);
        assert_eq!(b.track(10.0, 0.0, -4.0), 30.0);
        assert_eq!(b.track(10.0, 0.0, f64::NAN), 30.0);
    }

    #[test]
    fn nan_pointer_is_ignored() {
        let mut b = RevealBoundary::default();
        assert_eq!(b.set(f64::NAN), 50.0);
        assert_eq!(b.set(f64::INFINITY), 50.0);
    }
}
