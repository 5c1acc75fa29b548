//! # Controller Input Mapper Module
//!
//! Turns raw evdev events from the Retroid Pocket gamepad into [`RawSample`]s
//! and folds them into a [`LiveState`].
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Input | evdev Code | Control |
//! |-------|------------|---------|
//! | Left stick X | ABS_X (0) | `axis_left` x |
//! | Left stick Y | ABS_Y (1) | `axis_left` y |
//! | Right stick X | ABS_RX (3) | `axis_right` x |
//! | Right stick Y | ABS_RY (4) | `axis_right` y |
//! | L2 trigger | ABS_HAT2X (20) | `trigger_left` |
//! | R2 trigger | ABS_HAT2Y (21) | `trigger_right` |
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code | Action |
//! |--------|------------|--------|
//! | B | BTN_EAST | Cancel the running calibration |
//! | A | BTN_SOUTH | Confirm the selected control |
//!
//! The D-pad reports on ABS_HAT0Y: -1 moves the selection up, +1 down.

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};

use super::live::{LiveState, NavInput, RawSample};
use crate::params::control::{ControlId, SubAxis};

/// Maps an absolute axis to the calibrated input it reports.
#[must_use]
pub fn input_for_axis(axis: AbsoluteAxisType) -> Option<(ControlId, Option<SubAxis>)> {
    match axis {
        AbsoluteAxisType::ABS_X => Some((ControlId::AxisLeft, Some(SubAxis::X))),
        AbsoluteAxisType::ABS_Y => Some((ControlId::AxisLeft, Some(SubAxis::Y))),
        AbsoluteAxisType::ABS_RX => Some((ControlId::AxisRight, Some(SubAxis::X))),
        AbsoluteAxisType::ABS_RY => Some((ControlId::AxisRight, Some(SubAxis::Y))),
        AbsoluteAxisType::ABS_HAT2X => Some((ControlId::TriggerLeft, None)),
        AbsoluteAxisType::ABS_HAT2Y => Some((ControlId::TriggerRight, None)),
        _ => None,
    }
}

/// Converts one evdev event into a raw sample, if it carries one.
#[must_use]
pub fn sample_from_event(event: &InputEvent) -> Option<RawSample> {
    match event.kind() {
        InputEventKind::AbsAxis(axis) => input_for_axis(axis).map(|(control, sub_axis)| RawSample {
            control,
            sub_axis,
            value: event.value(),
        }),
        _ => None,
    }
}

/// Parses raw evdev events and maintains the live gamepad state.
///
/// Not thread-safe; drive it from the task that owns the event stream.
///
/// # Examples
///
/// ```
/// use evdev::{AbsoluteAxisType, EventType, InputEvent};
/// use gpcal::controller::mapper::EventMapper;
/// use gpcal::params::control::ControlId;
///
/// let mut mapper = EventMapper::new();
/// mapper.process_event(&InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_HAT2Y.0, 812));
/// assert_eq!(mapper.state().value(ControlId::TriggerRight, None), Some(812));
/// ```
#[derive(Debug, Default)]
pub struct EventMapper {
    state: LiveState,
}

impl EventMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &LiveState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LiveState {
        &mut self.state
    }

    /// Processes a single evdev input event.
    ///
    /// Axis events update the live value of their input; a B button press
    /// raises a cancel request; D-pad and A presses queue panel navigation.
    /// Everything else is ignored.
    pub fn process_event(&mut self, event: &InputEvent) {
        match event.kind() {
            InputEventKind::AbsAxis(AbsoluteAxisType::ABS_HAT0Y) => match event.value() {
                -1 => self.state.push_navigation(NavInput::Previous),
                1 => self.state.push_navigation(NavInput::Next),
                _ => {}
            },
            InputEventKind::AbsAxis(_) => {
                if let Some(sample) = sample_from_event(event) {
                    self.state.ingest(sample);
                }
            }
            InputEventKind::Key(Key::BTN_EAST) if event.value() == 1 => {
                self.state.request_cancel();
            }
            InputEventKind::Key(Key::BTN_SOUTH) if event.value() == 1 => {
                self.state.push_navigation(NavInput::Confirm);
            }
            _ => {
                // Sync events, other buttons, and auto-repeat
            }
        }
    }
}
