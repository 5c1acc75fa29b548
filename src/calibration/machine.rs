//! # Calibration State Machine
//!
//! One parameterized capture procedure shared by all four controls.
//!
//! Each calibrated sub-axis walks through its directions (positive then
//! negative for a stick, positive only for a trigger). Every direction is
//! captured three times as `prompt -> extreme -> rest`, which gives 9 steps per
//! direction:
//!
//! ```text
//! step s:  direction = s / 9,  pass = (s % 9) / 3,  phase = s % 3
//!          phase 0 prompt, phase 1 extreme, phase 2 rest
//! ```
//!
//! Step `9 * directions` derives the sub-axis parameters. A step is evaluated
//! once per tick and either advances or keeps waiting; a mismatching sample is
//! never an error.
//!
//! ## Acceptance
//!
//! All capture steps require the live value to be settled (held for more than
//! the dwell time). With `k` samples already summed in a slot:
//!
//! | Step | Pass 0 | Pass k |
//! |------|--------|--------|
//! | Extreme | beyond half the configured bound, and close to the measured extreme | `k·v` close to the extreme sum |
//! | Rest | stick: close to zero relative to the measured extreme; trigger: below half the bound and close to the measured minimum relative to the measured maximum | `k·v` close to the rest sum, relative to the extreme sum |
//!
//! Measured extremes are the per-event ranges of [`LiveState`]. The caller
//! resets them with [`LiveState::reset_measurements`] when a run starts.

use tracing::{debug, info, warn};

use super::derive::{derive_stick, derive_trigger, Derivation};
use super::stability::{within_tolerance, StabilityWindow};
use crate::config::CalibrationConfig;
use crate::controller::live::{LiveState, Measurement};
use crate::error::{GpcalError, Result};
use crate::params::control::{ControlId, SubAxis};
use crate::params::store::ParameterStore;

/// Steps per direction: 3 passes of prompt, extreme and rest
pub const STEPS_PER_DIRECTION: usize = 9;

const PHASES: usize = 3;

/// Capture targets of one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionSpec {
    /// True for the positive side of the range
    pub positive: bool,
    /// Slot summing the extreme captures
    pub extreme_slot: usize,
    /// Slot summing the rest captures that follow them
    pub rest_slot: usize,
}

const POSITIVE: DirectionSpec = DirectionSpec {
    positive: true,
    extreme_slot: 3,
    rest_slot: 2,
};

const NEGATIVE: DirectionSpec = DirectionSpec {
    positive: false,
    extreme_slot: 1,
    rest_slot: 0,
};

/// Directions captured for `control`, in order
#[must_use]
pub fn directions(control: ControlId) -> &'static [DirectionSpec] {
    if control.is_stick() {
        &[POSITIVE, NEGATIVE]
    } else {
        &[POSITIVE]
    }
}

fn direction_name(sub_axis: Option<SubAxis>, positive: bool) -> &'static str {
    match (sub_axis, positive) {
        (Some(SubAxis::Y), true) => "down",
        (Some(SubAxis::Y), false) => "up",
        (_, true) => "right",
        (_, false) => "left",
    }
}

/// Transient state of the sub-axis being captured
///
/// Replaced as a whole on every step transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRun {
    pub control: ControlId,
    pub sub_axis: Option<SubAxis>,
    pub step: usize,
    /// Summed captures, see [`super::derive`] for the slot layout
    pub accumulator: [i64; 4],
    pub window: StabilityWindow,
}

impl CalibrationRun {
    fn start(control: ControlId, sub_axis: Option<SubAxis>) -> Self {
        Self {
            control,
            sub_axis,
            step: 0,
            accumulator: [0; 4],
            window: StabilityWindow::new(),
        }
    }

    fn next_step(self) -> Self {
        Self {
            step: self.step + 1,
            ..self
        }
    }

    fn capture(self, slot: usize, value: i32, first: bool) -> Self {
        let mut accumulator = self.accumulator;
        accumulator[slot] = if first {
            i64::from(value)
        } else {
            accumulator[slot] + i64::from(value)
        };
        Self {
            step: self.step + 1,
            accumulator,
            ..self
        }
    }
}

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Operator instruction for the next captures
    Prompt(String),
    /// A sample was accepted into `slot`
    Captured {
        sub_axis: Option<SubAxis>,
        slot: usize,
        value: i32,
    },
    /// A sub-axis finished and its parameters were written
    Derived {
        sub_axis: Option<SubAxis>,
        derivation: Derivation,
    },
    /// A sub-axis produced no usable range and starts over
    Restarted { sub_axis: Option<SubAxis>, reason: String },
    /// Every sub-axis of the control is done
    Completed,
}

/// Capture procedure for one control
#[derive(Debug, Clone)]
pub struct CalibrationStateMachine {
    config: CalibrationConfig,
    run: CalibrationRun,
    finished: bool,
}

impl CalibrationStateMachine {
    /// Starts capturing the first sub-axis of `control`
    #[must_use]
    pub fn new(control: ControlId, config: &CalibrationConfig) -> Self {
        let first = control.calibrated_axes().first().copied().flatten();
        Self {
            config: config.clone(),
            run: CalibrationRun::start(control, first),
            finished: false,
        }
    }

    #[must_use]
    pub fn control(&self) -> ControlId {
        self.run.control
    }

    #[must_use]
    pub fn run(&self) -> &CalibrationRun {
        &self.run
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Index of the derivation step of the current sub-axis
    #[must_use]
    pub fn derivation_step(&self) -> usize {
        directions(self.run.control).len() * STEPS_PER_DIRECTION
    }

    /// Evaluates one tick
    ///
    /// Folds the live value of the current sub-axis into the stability window,
    /// then evaluates the current step against it and its measured range. Derived parameters
    /// are written into `store`, which must belong to the same control.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::Session`] if `store` belongs to another control.
    pub fn tick(&mut self, tick: u64, live: &LiveState, store: &mut ParameterStore) -> Result<Vec<MachineEvent>> {
        if self.finished {
            return Ok(Vec::new());
        }
        if store.control() != self.run.control {
            return Err(GpcalError::Session(format!(
                "{} parameters passed to the {} calibration",
                store.control(),
                self.run.control
            )));
        }

        let control = self.run.control;
        let value = live.value(control, self.run.sub_axis);
        if let Some(value) = value {
            if self.run.window.observe(value, tick) {
                debug!("{} {:?} changed to {} at tick {}", control, self.run.sub_axis, value, tick);
            }
        }

        if self.run.step >= self.derivation_step() {
            return self.finish_sub_axis(store);
        }

        let dir_index = self.run.step / STEPS_PER_DIRECTION;
        let within = self.run.step % STEPS_PER_DIRECTION;
        let pass = within / PHASES;
        let direction = directions(control)[dir_index];

        match within % PHASES {
            0 => {
                self.run = self.run.next_step();
                let text = self.prompt(dir_index, pass);
                debug!("{}: {}", control, text);
                Ok(vec![MachineEvent::Prompt(text)])
            }
            phase => {
                let Some(value) = value else {
                    return Ok(Vec::new());
                };
                if !self.run.window.is_settled(self.config.min_dwell_ticks) {
                    return Ok(Vec::new());
                }

                let measured = live.measurement(control, self.run.sub_axis);
                let accepted = if phase == 1 {
                    self.accept_extreme(direction, pass, value, measured, store)
                } else {
                    self.accept_rest(direction, pass, value, measured, store)
                };
                if !accepted {
                    return Ok(Vec::new());
                }

                let slot = if phase == 1 {
                    direction.extreme_slot
                } else {
                    direction.rest_slot
                };
                self.run = self.run.capture(slot, value, pass == 0);
                debug!(
                    "{} {:?}: captured {} into slot {} (sum {})",
                    control, self.run.sub_axis, value, slot, self.run.accumulator[slot]
                );
                Ok(vec![MachineEvent::Captured {
                    sub_axis: self.run.sub_axis,
                    slot,
                    value,
                }])
            }
        }
    }

    fn prompt(&self, dir_index: usize, pass: usize) -> String {
        let sub_axis = self.run.sub_axis;
        if self.run.control.is_stick() {
            let axis_index = match sub_axis {
                Some(SubAxis::Y) => 1,
                _ => 0,
            };
            let total = self.run.control.calibrated_axes().len() * 2 * PHASES;
            let number = axis_index * 2 * PHASES + dir_index * PHASES + pass + 1;
            let direction = direction_name(sub_axis, directions(self.run.control)[dir_index].positive);
            format!(
                "Step {}/{}: Push stick full {} few seconds and release",
                number, total, direction
            )
        } else {
            format!("Step {}/{}: Push trigger to max few seconds and release", pass + 1, PHASES)
        }
    }

    fn bound(&self, direction: DirectionSpec, store: &ParameterStore) -> Option<i64> {
        let value = match self.run.sub_axis {
            Some(axis) => store
                .axis(axis)
                .map(|p| if direction.positive { p.max } else { p.min }),
            None => store.trigger().map(|p| p.max),
        };
        value.map(i64::from)
    }

    fn accept_extreme(
        &self,
        direction: DirectionSpec,
        pass: usize,
        value: i32,
        measured: Measurement,
        store: &ParameterStore,
    ) -> bool {
        let tolerance = self.config.detection_tolerance_percent;
        let v = i64::from(value);

        if pass == 0 {
            let Some(bound) = self.bound(direction, store) else {
                return false;
            };
            let beyond_half = if direction.positive {
                2 * v > bound
            } else {
                2 * v < bound
            };

            let extreme = if direction.positive {
                measured.max
            } else {
                measured.min
            };
            beyond_half && extreme.map_or(false, |m| within_tolerance(v - i64::from(m), i64::from(m), tolerance))
        } else {
            let sum = self.run.accumulator[direction.extreme_slot];
            within_tolerance(pass as i64 * v - sum, sum, tolerance)
        }
    }

    fn accept_rest(
        &self,
        direction: DirectionSpec,
        pass: usize,
        value: i32,
        measured: Measurement,
        store: &ParameterStore,
    ) -> bool {
        let tolerance = self.config.detection_tolerance_percent;
        let v = i64::from(value);

        if pass == 0 {
            if self.run.control.is_stick() {
                let extreme = if direction.positive {
                    measured.max
                } else {
                    measured.min
                };
                extreme.map_or(false, |m| within_tolerance(v, i64::from(m), tolerance))
            } else {
                // A trigger still pressed past half travel is not resting
                let released = self.bound(direction, store).map_or(false, |bound| 2 * v < bound);
                match (measured.min, measured.max) {
                    (Some(min), Some(max)) if released => {
                        within_tolerance(v - i64::from(min), i64::from(max), tolerance)
                    }
                    _ => false,
                }
            }
        } else {
            let rest = self.run.accumulator[direction.rest_slot];
            let extreme = self.run.accumulator[direction.extreme_slot];
            within_tolerance(pass as i64 * v - rest, extreme, tolerance)
        }
    }

    fn finish_sub_axis(&mut self, store: &mut ParameterStore) -> Result<Vec<MachineEvent>> {
        let control = self.run.control;
        let sub_axis = self.run.sub_axis;
        let accumulator = self.run.accumulator;

        let derivation = match sub_axis {
            Some(axis) => match store.axis(axis) {
                Some(current) => derive_stick(&accumulator, current, &self.config),
                None => return Err(GpcalError::Session(format!("{} has no {} axis", control, axis.as_str()))),
            },
            None => match store.trigger() {
                Some(current) => derive_trigger(&accumulator, current, &self.config),
                None => return Err(GpcalError::Session(format!("{} is not a trigger", control))),
            },
        };

        let written = match (&derivation, sub_axis) {
            (Derivation::Stick(d), Some(axis)) => store.set_axis(axis, d.params).map_err(|e| e.to_string()),
            (Derivation::Trigger(d), None) => store.set_trigger(d.params).map_err(|e| e.to_string()),
            (Derivation::Unchanged, _) => Ok(()),
            (Derivation::Degenerate(reason), _) => Err(reason.clone()),
            _ => Err("derivation does not match the control".to_string()),
        };

        if let Err(reason) = written {
            warn!("{} {:?}: discarding captures: {}", control, sub_axis, reason);
            self.run = CalibrationRun::start(control, sub_axis);
            return Ok(vec![MachineEvent::Restarted { sub_axis, reason }]);
        }

        match &derivation {
            Derivation::Unchanged => info!("{} {:?}: already calibrated, keeping parameters", control, sub_axis),
            _ => info!("{} {:?}: derived {:?}", control, sub_axis, derivation),
        }

        let mut events = vec![MachineEvent::Derived { sub_axis, derivation }];

        let axes = control.calibrated_axes();
        let next = axes
            .iter()
            .position(|&a| a == sub_axis)
            .and_then(|index| axes.get(index + 1))
            .copied();

        match next {
            Some(next_axis) => {
                self.run = CalibrationRun::start(control, next_axis);
            }
            None => {
                self.finished = true;
                events.push(MachineEvent::Completed);
            }
        }
        Ok(events)
    }
}
