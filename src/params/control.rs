//! # Control Identifiers
//!
//! Names the physical controls of the gamepad, their sub-axes, and the
//! calibration parameters the driver exposes for each of them.
//!
//! ## Parameter Keys
//!
//! | Control | Key pattern | Example |
//! |---------|-------------|---------|
//! | Left stick | `axis_left{x,y,z}_{param}` | `axis_leftx_max` |
//! | Right stick | `axis_right{x,y,z}_{param}` | `axis_righty_center` |
//! | Left trigger | `trigger_left_{param}` | `trigger_left_deadzone` |
//! | Right trigger | `trigger_right_{param}` | `trigger_right_max` |

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::GpcalError;

/// Global flag key that makes the driver reload its parameters.
pub const UPDATE_PARAMS_KEY: &str = "update_params";

/// One analog input of the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    /// Left analog stick
    AxisLeft,
    /// Right analog stick
    AxisRight,
    /// Left analog trigger
    TriggerLeft,
    /// Right analog trigger
    TriggerRight,
}

impl ControlId {
    /// All controls in canonical (persistence) order.
    pub const ALL: [ControlId; 4] = [
        ControlId::AxisLeft,
        ControlId::AxisRight,
        ControlId::TriggerLeft,
        ControlId::TriggerRight,
    ];

    /// Prefix used to build parameter keys.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            ControlId::AxisLeft => "axis_left",
            ControlId::AxisRight => "axis_right",
            ControlId::TriggerLeft => "trigger_left",
            ControlId::TriggerRight => "trigger_right",
        }
    }

    /// Human-facing label, also accepted on the command line.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ControlId::AxisLeft => "stickleft",
            ControlId::AxisRight => "stickright",
            ControlId::TriggerLeft => "triggerleft",
            ControlId::TriggerRight => "triggerright",
        }
    }

    /// Returns true for the two analog sticks.
    #[must_use]
    pub fn is_stick(self) -> bool {
        matches!(self, ControlId::AxisLeft | ControlId::AxisRight)
    }

    /// Sub-axes the calibration procedure walks through, in order.
    ///
    /// Sticks are calibrated on x then y; the z axis is only reset.
    /// Triggers have a single implicit axis.
    #[must_use]
    pub fn calibrated_axes(self) -> &'static [Option<SubAxis>] {
        if self.is_stick() {
            &[Some(SubAxis::X), Some(SubAxis::Y)]
        } else {
            &[None]
        }
    }

    /// Builds the transport key of `param` on `sub_axis`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gpcal::params::control::{ControlId, Parameter, SubAxis};
    ///
    /// assert_eq!(
    ///     ControlId::AxisLeft.key(Some(SubAxis::X), Parameter::Max),
    ///     "axis_leftx_max"
    /// );
    /// assert_eq!(
    ///     ControlId::TriggerRight.key(None, Parameter::Deadzone),
    ///     "trigger_right_deadzone"
    /// );
    /// ```
    #[must_use]
    pub fn key(self, sub_axis: Option<SubAxis>, param: Parameter) -> String {
        match sub_axis {
            Some(axis) => format!("{}{}_{}", self.key_prefix(), axis.as_str(), param.as_str()),
            None => format!("{}_{}", self.key_prefix(), param.as_str()),
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ControlId {
    type Err = GpcalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stickleft" | "axis_left" | "left-stick" => Ok(ControlId::AxisLeft),
            "stickright" | "axis_right" | "right-stick" => Ok(ControlId::AxisRight),
            "triggerleft" | "trigger_left" | "left-trigger" => Ok(ControlId::TriggerLeft),
            "triggerright" | "trigger_right" | "right-trigger" => Ok(ControlId::TriggerRight),
            _ => Err(GpcalError::UnknownControl(s.to_string())),
        }
    }
}

/// Sub-axis of an analog stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubAxis {
    X,
    Y,
    Z,
}

impl SubAxis {
    /// All stick sub-axes in persistence order.
    pub const ALL: [SubAxis; 3] = [SubAxis::X, SubAxis::Y, SubAxis::Z];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubAxis::X => "x",
            SubAxis::Y => "y",
            SubAxis::Z => "z",
        }
    }

    #[must_use]
    pub(crate) fn index(self) -> usize {
        match self {
            SubAxis::X => 0,
            SubAxis::Y => 1,
            SubAxis::Z => 2,
        }
    }
}

/// Calibration parameter name.
///
/// `Center` and `Min` exist only on stick sub-axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Antideadzone,
    Center,
    Deadzone,
    Max,
    Min,
}

impl Parameter {
    /// Stick parameters in persistence order.
    pub const STICK: [Parameter; 5] = [
        Parameter::Antideadzone,
        Parameter::Center,
        Parameter::Deadzone,
        Parameter::Max,
        Parameter::Min,
    ];

    /// Trigger parameters in persistence order.
    pub const TRIGGER: [Parameter; 3] = [Parameter::Antideadzone, Parameter::Deadzone, Parameter::Max];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::Antideadzone => "antideadzone",
            Parameter::Center => "center",
            Parameter::Deadzone => "deadzone",
            Parameter::Max => "max",
            Parameter::Min => "min",
        }
    }
}

/// Resolves a transport key back to its control, sub-axis and parameter.
///
/// Returns `None` for keys the calibration does not own (including
/// [`UPDATE_PARAMS_KEY`]).
#[must_use]
pub fn parse_key(key: &str) -> Option<(ControlId, Option<SubAxis>, Parameter)> {
    ControlId::ALL.into_iter().find_map(|control| {
        if control.is_stick() {
            SubAxis::ALL.into_iter().find_map(|axis| {
                Parameter::STICK
                    .into_iter()
                    .find(|&param| control.key(Some(axis), param) == key)
                    .map(|param| (control, Some(axis), param))
            })
        } else {
            Parameter::TRIGGER
                .into_iter()
                .find(|&param| control.key(None, param) == key)
                .map(|param| (control, None, param))
        }
    })
}
