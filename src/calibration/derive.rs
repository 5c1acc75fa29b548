//! # Parameter Derivation
//!
//! Turns the summed captures of a finished sub-axis into driver parameters.
//!
//! ## Accumulator Slots
//!
//! | Slot | Stick | Trigger |
//! |------|-------|---------|
//! | 3 | sum of positive extremes | sum of max presses |
//! | 2 | sum of rests after positive | sum of rests |
//! | 1 | sum of negative extremes | unused |
//! | 0 | sum of rests after negative | unused |
//!
//! Every slot holds three samples. Intermediate math is done in `f64` and the
//! final values are truncated toward zero.

use crate::config::CalibrationConfig;
use crate::params::store::{AxisParams, TriggerParams};

/// Captures per slot
pub const PASSES: i64 = 3;

/// Result of a stick sub-axis derivation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickDerivation {
    /// Midpoint of the two averaged rest readings, before recentering
    pub axis_center: f64,
    /// Usable symmetric range, before truncation
    pub axis_max: f64,
    /// Deadzone after the floor clamp, before truncation
    pub deadzone: f64,
    /// Values to write (`center` is the driver offset, i.e. `-axis_center`)
    pub params: AxisParams,
}

/// Result of a trigger derivation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerDerivation {
    /// Averaged max minus averaged rest
    pub span: f64,
    /// Deadzone before truncation
    pub deadzone: f64,
    pub params: TriggerParams,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// Captures match the configured bounds exactly; parameters stay as they are
    Unchanged,
    Stick(StickDerivation),
    Trigger(TriggerDerivation),
    /// Captures cannot produce a usable range
    Degenerate(String),
}

fn averaged(accumulator: &[i64; 4]) -> [f64; 4] {
    accumulator.map(|sum| sum as f64 / PASSES as f64)
}

/// Derives stick sub-axis parameters from its four slots.
///
/// `current` holds the bounds the capture was measured against.
///
/// # Examples
///
/// ```
/// use gpcal::calibration::derive::{derive_stick, Derivation};
/// use gpcal::config::CalibrationConfig;
/// use gpcal::params::store::AxisParams;
///
/// let current = AxisParams::defaults(1408);
/// let acc = [0, -3 * 1390, 0, 3 * 1400];
///
/// match derive_stick(&acc, &current, &CalibrationConfig::default()) {
///     Derivation::Stick(d) => {
///         assert_eq!(d.params.max, 1320);
///         assert_eq!(d.params.deadzone, 66);
///     }
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub fn derive_stick(accumulator: &[i64; 4], current: &AxisParams, config: &CalibrationConfig) -> Derivation {
    if accumulator[3] == PASSES * i64::from(current.max)
        && accumulator[2] == 0
        && accumulator[1] == PASSES * i64::from(current.min)
        && accumulator[0] == 0
    {
        return Derivation::Unchanged;
    }

    let avg = averaged(accumulator);
    let axis_center = (avg[2] + avg[0]) / 2.0;
    let recentered = avg.map(|v| v - axis_center);

    let axis_max = f64::from(config.axis_max_percent) * recentered[1].abs().min(recentered[3]) / 100.0;
    let max = axis_max as i32;
    if max <= 0 {
        return Derivation::Degenerate(format!(
            "no usable range (extremes {:.1} / {:.1} around center {:.1})",
            recentered[3], recentered[1], axis_center
        ));
    }

    let mini = f64::from(config.axis_deadzone_percent_mini);
    let mut deadzone =
        f64::from(config.axis_deadzone_percent) * (recentered[0].abs() + recentered[2].abs()) / 200.0;
    if 100.0 * deadzone / axis_max < mini {
        deadzone = mini * axis_max / 100.0;
    }

    let deadzone_int = deadzone as i32;
    let antideadzone = (f64::from(config.axis_antideadzone_percent) * f64::from(deadzone_int) / 100.0) as i32;

    Derivation::Stick(StickDerivation {
        axis_center,
        axis_max,
        deadzone,
        params: AxisParams {
            antideadzone,
            center: -(axis_center as i32),
            deadzone: deadzone_int,
            max,
            min: -max,
        },
    })
}

/// Derives trigger parameters from slots 3 (max) and 2 (rest).
///
/// The driver reports `max(configured_max - raw, 0)`, so the rest level is
/// removed from the span first and only the extra deadzone percentage above
/// 100% is applied to it.
pub fn derive_trigger(accumulator: &[i64; 4], current: &TriggerParams, config: &CalibrationConfig) -> Derivation {
    if accumulator[3] == PASSES * i64::from(current.max) && accumulator[2] == 0 {
        return Derivation::Unchanged;
    }

    let avg = averaged(accumulator);
    let span = avg[3] - avg[2];
    let max = (f64::from(config.trigger_max_percent) * span / 100.0) as i32;
    if max <= 0 {
        return Derivation::Degenerate(format!(
            "no usable range (max {:.1}, rest {:.1})",
            avg[3], avg[2]
        ));
    }

    let deadzone = (f64::from(config.trigger_deadzone_percent) - 100.0) * avg[2] / 100.0;
    let antideadzone = f64::from(config.trigger_antideadzone_percent) * deadzone / 100.0;

    Derivation::Trigger(TriggerDerivation {
        span,
        deadzone,
        params: TriggerParams {
            antideadzone: antideadzone as i32,
            deadzone: deadzone as i32,
            max,
        },
    })
}
