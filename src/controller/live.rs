//! # Live Input State
//!
//! Latest raw reading of every calibrated input plus the extremes seen since
//! the last reset. Only the most recent value per input is kept; samples are
//! folded in as they arrive and read once per tick.

use serde::Serialize;

use crate::params::control::{ControlId, SubAxis};

/// One raw reading from the gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub control: ControlId,
    /// `None` for triggers
    pub sub_axis: Option<SubAxis>,
    pub value: i32,
}

/// Latest value and observed range of one input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Measurement {
    pub value: Option<i32>,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl Measurement {
    /// Records `value` as the latest reading and widens the range.
    pub fn record(&mut self, value: i32) {
        self.value = Some(value);
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    /// Forgets the observed range, keeping the latest value.
    pub fn reset_range(&mut self) {
        self.min = None;
        self.max = None;
    }
}

/// Panel navigation requested from the gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavInput {
    Previous,
    Next,
    Confirm,
}

/// Inputs tracked per gamepad: both sticks on x/y, then both triggers
const TRACKED: usize = 6;

fn slot(control: ControlId, sub_axis: Option<SubAxis>) -> Option<usize> {
    match (control, sub_axis) {
        (ControlId::AxisLeft, Some(SubAxis::X)) => Some(0),
        (ControlId::AxisLeft, Some(SubAxis::Y)) => Some(1),
        (ControlId::AxisRight, Some(SubAxis::X)) => Some(2),
        (ControlId::AxisRight, Some(SubAxis::Y)) => Some(3),
        (ControlId::TriggerLeft, None) => Some(4),
        (ControlId::TriggerRight, None) => Some(5),
        _ => None,
    }
}

/// Live readings of the whole gamepad
///
/// # Examples
///
/// ```
/// use gpcal::controller::live::{LiveState, RawSample};
/// use gpcal::params::control::{ControlId, SubAxis};
///
/// let mut live = LiveState::new();
/// live.ingest(RawSample { control: ControlId::AxisLeft, sub_axis: Some(SubAxis::X), value: 120 });
/// live.ingest(RawSample { control: ControlId::AxisLeft, sub_axis: Some(SubAxis::X), value: -40 });
///
/// let m = live.measurement(ControlId::AxisLeft, Some(SubAxis::X));
/// assert_eq!(m.value, Some(-40));
/// assert_eq!(m.max, Some(120));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveState {
    measurements: [Measurement; TRACKED],
    cancel_requested: bool,
    navigation: Vec<NavInput>,
}

impl LiveState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one sample into the state. Samples for untracked inputs
    /// (stick z axes) are ignored.
    pub fn ingest(&mut self, sample: RawSample) {
        if let Some(index) = slot(sample.control, sample.sub_axis) {
            self.measurements[index].record(sample.value);
        }
    }

    /// Latest value of an input, if any sample arrived yet
    #[must_use]
    pub fn value(&self, control: ControlId, sub_axis: Option<SubAxis>) -> Option<i32> {
        self.measurement(control, sub_axis).value
    }

    #[must_use]
    pub fn measurement(&self, control: ControlId, sub_axis: Option<SubAxis>) -> Measurement {
        slot(control, sub_axis)
            .map(|index| self.measurements[index])
            .unwrap_or_default()
    }

    /// Clears the observed ranges of every sub-axis of `control`
    pub fn reset_measurements(&mut self, control: ControlId) {
        for &sub_axis in control.calibrated_axes() {
            if let Some(index) = slot(control, sub_axis) {
                self.measurements[index].reset_range();
            }
        }
    }

    /// Flags a user cancel request (gamepad B button)
    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    /// Returns and clears the pending cancel request
    pub fn take_cancel_request(&mut self) -> bool {
        std::mem::take(&mut self.cancel_requested)
    }

    pub fn push_navigation(&mut self, input: NavInput) {
        self.navigation.push(input);
    }

    /// Returns and clears the navigation inputs received since the last call
    pub fn take_navigation(&mut self) -> Vec<NavInput> {
        std::mem::take(&mut self.navigation)
    }
}
