//! # Stability Window
//!
//! Tick-based hold detection. A value counts as intentionally held once it
//! has stayed unchanged for more than the dwell time.
//!
//! Dwell is expressed in ticks rather than wall-clock time, so a synthetic
//! tick sequence replays exactly in tests.

/// Tracks how long the latest observed value has been unchanged.
///
/// # Examples
///
/// ```
/// use gpcal::calibration::stability::StabilityWindow;
///
/// let mut window = StabilityWindow::new();
/// assert!(window.observe(1400, 10));
/// assert!(!window.observe(1400, 40));
/// assert!(!window.is_settled(30));
///
/// window.observe(1400, 41);
/// assert!(window.is_settled(30));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilityWindow {
    last_value: Option<i32>,
    last_change_tick: u64,
    current_tick: u64,
}

impl StabilityWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` at `tick`. Returns true if it differs from the
    /// previously observed value, in which case the hold restarts at `tick`.
    pub fn observe(&mut self, value: i32, tick: u64) -> bool {
        self.current_tick = tick;
        if self.last_value == Some(value) {
            return false;
        }
        self.last_value = Some(value);
        self.last_change_tick = tick;
        true
    }

    /// True once the value has been held for more than `min_dwell_ticks`.
    /// Never true before the first observation.
    #[must_use]
    pub fn is_settled(&self, min_dwell_ticks: u64) -> bool {
        self.last_value.is_some() && self.current_tick.saturating_sub(self.last_change_tick) > min_dwell_ticks
    }

    /// Latest observed value
    #[must_use]
    pub fn value(&self) -> Option<i32> {
        self.last_value
    }

    /// Ticks since the value last changed
    #[must_use]
    pub fn held_ticks(&self) -> u64 {
        self.current_tick.saturating_sub(self.last_change_tick)
    }
}

/// Relative tolerance check: `|delta| / |reference| < tolerance_percent / 100`.
///
/// Evaluated in integer arithmetic as `|100 · delta| < tolerance · |reference|`.
/// A zero reference never matches, so a capture step whose reference is still
/// zero simply keeps waiting.
#[must_use]
pub fn within_tolerance(delta: i64, reference: i64, tolerance_percent: u32) -> bool {
    if reference == 0 {
        return false;
    }
    (100 * delta).abs() < i64::from(tolerance_percent) * reference.abs()
}
