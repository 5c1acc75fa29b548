//! # Parameter Store
//!
//! Typed calibration parameters for one control.
//!
//! A stick owns one [`AxisParams`] group per sub-axis (`x`, `y`, `z`); a
//! trigger owns a single [`TriggerParams`] group. Values are plain integers in
//! driver units.
//!
//! ## Invariants
//!
//! - Sticks: `min <= 0 <= max`
//! - All controls: `0 <= deadzone <= max` and `0 <= antideadzone <= deadzone`
//!
//! Values loaded from the device are kept as-is even when they break these
//! rules (a warning is logged); values written by a calibration are checked.

use serde::Serialize;
use tracing::{debug, warn};

use super::control::{ControlId, Parameter, SubAxis};
use super::transport::ParamTransport;
use crate::config::DefaultsConfig;
use crate::error::{GpcalError, Result};

/// Parameters of one stick sub-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AxisParams {
    pub antideadzone: i32,
    pub center: i32,
    pub deadzone: i32,
    pub max: i32,
    pub min: i32,
}

impl AxisParams {
    /// Reset values: no offset, no deadzone, symmetric `±axis_max` range.
    #[must_use]
    pub fn defaults(axis_max: i32) -> Self {
        Self {
            antideadzone: 0,
            center: 0,
            deadzone: 0,
            max: axis_max,
            min: -axis_max,
        }
    }

    #[must_use]
    pub fn get(&self, param: Parameter) -> i32 {
        match param {
            Parameter::Antideadzone => self.antideadzone,
            Parameter::Center => self.center,
            Parameter::Deadzone => self.deadzone,
            Parameter::Max => self.max,
            Parameter::Min => self.min,
        }
    }

    fn set(&mut self, param: Parameter, value: i32) {
        match param {
            Parameter::Antideadzone => self.antideadzone = value,
            Parameter::Center => self.center = value,
            Parameter::Deadzone => self.deadzone = value,
            Parameter::Max => self.max = value,
            Parameter::Min => self.min = value,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.min > 0 || self.max < 0 {
            return Err(format!("range must straddle zero (min {}, max {})", self.min, self.max));
        }
        check_deadzones(self.deadzone, self.antideadzone, self.max)
    }
}

/// Parameters of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TriggerParams {
    pub antideadzone: i32,
    pub deadzone: i32,
    pub max: i32,
}

impl TriggerParams {
    #[must_use]
    pub fn defaults(trigger_max: i32) -> Self {
        Self {
            antideadzone: 0,
            deadzone: 0,
            max: trigger_max,
        }
    }

    /// Returns `None` for parameters a trigger does not have.
    #[must_use]
    pub fn get(&self, param: Parameter) -> Option<i32> {
        match param {
            Parameter::Antideadzone => Some(self.antideadzone),
            Parameter::Deadzone => Some(self.deadzone),
            Parameter::Max => Some(self.max),
            Parameter::Center | Parameter::Min => None,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.max < 0 {
            return Err(format!("max must not be negative (max {})", self.max));
        }
        check_deadzones(self.deadzone, self.antideadzone, self.max)
    }
}

fn check_deadzones(deadzone: i32, antideadzone: i32, max: i32) -> std::result::Result<(), String> {
    if deadzone < 0 || deadzone > max {
        return Err(format!("deadzone {} outside 0..={}", deadzone, max));
    }
    if antideadzone < 0 || antideadzone > deadzone {
        return Err(format!("antideadzone {} outside 0..={}", antideadzone, deadzone));
    }
    Ok(())
}

/// Parameter groups of a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlParams {
    Stick { x: AxisParams, y: AxisParams, z: AxisParams },
    Trigger(TriggerParams),
}

/// Calibration parameters of a single control.
///
/// # Examples
///
/// ```
/// use gpcal::config::DefaultsConfig;
/// use gpcal::params::control::{ControlId, Parameter, SubAxis};
/// use gpcal::params::store::ParameterStore;
///
/// let store = ParameterStore::with_defaults(ControlId::AxisLeft, &DefaultsConfig::default());
/// assert_eq!(store.get(Some(SubAxis::X), Parameter::Max), Some(0x580));
/// assert_eq!(store.get(Some(SubAxis::X), Parameter::Min), Some(-0x580));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterStore {
    control: ControlId,
    params: ControlParams,
}

impl ParameterStore {
    /// Creates a store holding the reset values of `control`.
    #[must_use]
    pub fn with_defaults(control: ControlId, defaults: &DefaultsConfig) -> Self {
        let params = if control.is_stick() {
            let axis = AxisParams::defaults(defaults.axis_max);
            ControlParams::Stick { x: axis, y: axis, z: axis }
        } else {
            ControlParams::Trigger(TriggerParams::defaults(defaults.trigger_max))
        };
        Self { control, params }
    }

    /// Reads every parameter of `control` from the transport.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::StoreIo`] naming the first key that could not be read.
    pub fn load<T: ParamTransport + ?Sized>(control: ControlId, transport: &T) -> Result<Self> {
        let mut store = Self::with_defaults(control, &DefaultsConfig::default());
        for (sub_axis, param) in store.slots() {
            let key = control.key(sub_axis, param);
            let value = transport.read(&key)?;
            store.set(sub_axis, param, value)?;
        }

        if let Err(e) = store.validate() {
            warn!("Device parameters of {} break calibration invariants: {}", control, e);
        }
        debug!("Loaded {} parameters", control);
        Ok(store)
    }

    #[must_use]
    pub fn control(&self) -> ControlId {
        self.control
    }

    #[must_use]
    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    /// `(sub_axis, parameter)` pairs of this control in persistence order.
    fn slots(&self) -> Vec<(Option<SubAxis>, Parameter)> {
        match self.params {
            ControlParams::Stick { .. } => SubAxis::ALL
                .into_iter()
                .flat_map(|axis| Parameter::STICK.into_iter().map(move |param| (Some(axis), param)))
                .collect(),
            ControlParams::Trigger(_) => Parameter::TRIGGER.into_iter().map(|param| (None, param)).collect(),
        }
    }

    /// Key/value pairs in persistence order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, i32)> {
        self.slots()
            .into_iter()
            .filter_map(|(sub_axis, param)| {
                self.get(sub_axis, param)
                    .map(|value| (self.control.key(sub_axis, param), value))
            })
            .collect()
    }

    /// Parameters of a stick sub-axis; `None` on triggers.
    #[must_use]
    pub fn axis(&self, sub_axis: SubAxis) -> Option<&AxisParams> {
        match &self.params {
            ControlParams::Stick { x, y, z } => Some(match sub_axis {
                SubAxis::X => x,
                SubAxis::Y => y,
                SubAxis::Z => z,
            }),
            ControlParams::Trigger(_) => None,
        }
    }

    fn axis_mut(&mut self, sub_axis: SubAxis) -> Option<&mut AxisParams> {
        match &mut self.params {
            ControlParams::Stick { x, y, z } => Some(match sub_axis {
                SubAxis::X => x,
                SubAxis::Y => y,
                SubAxis::Z => z,
            }),
            ControlParams::Trigger(_) => None,
        }
    }

    /// Parameters of a trigger; `None` on sticks.
    #[must_use]
    pub fn trigger(&self) -> Option<&TriggerParams> {
        match &self.params {
            ControlParams::Trigger(params) => Some(params),
            ControlParams::Stick { .. } => None,
        }
    }

    /// Single value lookup.
    #[must_use]
    pub fn get(&self, sub_axis: Option<SubAxis>, param: Parameter) -> Option<i32> {
        match (sub_axis, &self.params) {
            (Some(axis), ControlParams::Stick { .. }) => self.axis(axis).map(|p| p.get(param)),
            (None, ControlParams::Trigger(params)) => params.get(param),
            _ => None,
        }
    }

    /// Single value update, without invariant checks.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::InvalidParameter`] if the control has no such parameter.
    pub fn set(&mut self, sub_axis: Option<SubAxis>, param: Parameter, value: i32) -> Result<()> {
        let control = self.control;
        let not_applicable = || GpcalError::InvalidParameter {
            key: control.key(sub_axis, param),
            reason: format!("{} has no such parameter", control),
        };

        let applied = match sub_axis {
            Some(axis) => match self.axis_mut(axis) {
                Some(params) => {
                    params.set(param, value);
                    true
                }
                None => false,
            },
            None => match &mut self.params {
                ControlParams::Trigger(params) => match param {
                    Parameter::Antideadzone => {
                        params.antideadzone = value;
                        true
                    }
                    Parameter::Deadzone => {
                        params.deadzone = value;
                        true
                    }
                    Parameter::Max => {
                        params.max = value;
                        true
                    }
                    Parameter::Center | Parameter::Min => false,
                },
                ControlParams::Stick { .. } => false,
            },
        };

        if applied {
            Ok(())
        } else {
            Err(not_applicable())
        }
    }

    /// Replaces a stick sub-axis with checked values.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::InvalidParameter`] if `params` break the invariants
    /// or this store is a trigger. The store is left untouched on error.
    pub fn set_axis(&mut self, sub_axis: SubAxis, params: AxisParams) -> Result<()> {
        let key = self.control.key(Some(sub_axis), Parameter::Max);
        params
            .check()
            .map_err(|reason| GpcalError::InvalidParameter { key: key.clone(), reason })?;

        let slot = self.axis_mut(sub_axis).ok_or_else(|| GpcalError::InvalidParameter {
            key,
            reason: "not a stick".to_string(),
        })?;
        *slot = params;
        Ok(())
    }

    /// Replaces trigger parameters with checked values.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::InvalidParameter`] if `params` break the invariants
    /// or this store is a stick. The store is left untouched on error.
    pub fn set_trigger(&mut self, params: TriggerParams) -> Result<()> {
        let key = self.control.key(None, Parameter::Max);
        params
            .check()
            .map_err(|reason| GpcalError::InvalidParameter { key: key.clone(), reason })?;

        match &mut self.params {
            ControlParams::Trigger(slot) => {
                *slot = params;
                Ok(())
            }
            ControlParams::Stick { .. } => Err(GpcalError::InvalidParameter {
                key,
                reason: "not a trigger".to_string(),
            }),
        }
    }

    /// Restores the reset values.
    pub fn reset(&mut self, defaults: &DefaultsConfig) {
        *self = Self::with_defaults(self.control, defaults);
    }

    /// Checks every group against the invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::InvalidParameter`] for the first offending group.
    pub fn validate(&self) -> Result<()> {
        match &self.params {
            ControlParams::Stick { x, y, z } => {
                for (axis, params) in [(SubAxis::X, x), (SubAxis::Y, y), (SubAxis::Z, z)] {
                    params.check().map_err(|reason| GpcalError::InvalidParameter {
                        key: self.control.key(Some(axis), Parameter::Max),
                        reason,
                    })?;
                }
                Ok(())
            }
            ControlParams::Trigger(params) => params.check().map_err(|reason| GpcalError::InvalidParameter {
                key: self.control.key(None, Parameter::Max),
                reason,
            }),
        }
    }

    /// Writes every parameter of this control to the transport.
    ///
    /// All-or-nothing: the current device values are read first, so a read
    /// failure aborts before anything is written. If a write fails, the keys
    /// already written are put back to the values read beforehand.
    ///
    /// # Errors
    ///
    /// Returns the [`GpcalError::StoreIo`] of the failing key.
    pub fn apply<T: ParamTransport + ?Sized>(&self, transport: &mut T) -> Result<()> {
        let entries = self.entries();

        let mut previous = Vec::with_capacity(entries.len());
        for (key, _) in &entries {
            previous.push((key.as_str(), transport.read(key)?));
        }

        for (index, (key, value)) in entries.iter().enumerate() {
            if let Err(e) = transport.write(key, *value) {
                warn!("Applying {} failed at {}: {}; rolling back", self.control, key, e);
                for (prev_key, prev_value) in previous.iter().take(index) {
                    if let Err(rollback) = transport.write(prev_key, *prev_value) {
                        warn!("Rollback of {} failed: {}", prev_key, rollback);
                    }
                }
                return Err(e);
            }
        }

        debug!("Applied {} ({} parameters)", self.control, entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::transport::mocks::MemoryTransport;

    fn defaults() -> DefaultsConfig {
        DefaultsConfig::default()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_stick_defaults() {
        let store = ParameterStore::with_defaults(ControlId::AxisRight, &defaults());
        for axis in SubAxis::ALL {
            assert_eq!(store.axis(axis), Some(&AxisParams::defaults(0x580)));
        }
        assert!(store.trigger().is_none());
    }

    #[test]
    fn test_trigger_defaults() {
        let store = ParameterStore::with_defaults(ControlId::TriggerLeft, &defaults());
        assert_eq!(store.trigger(), Some(&TriggerParams::defaults(0x755)));
        assert!(store.axis(SubAxis::X).is_none());
    }

    #[test]
    fn test_entries_order_stick() {
        let store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        let keys: Vec<String> = store.entries().into_iter().map(|(k, _)| k).collect();

        assert_eq!(keys.len(), 15);
        assert_eq!(keys[0], "axis_leftx_antideadzone");
        assert_eq!(keys[1], "axis_leftx_center");
        assert_eq!(keys[4], "axis_leftx_min");
        assert_eq!(keys[5], "axis_lefty_antideadzone");
        assert_eq!(keys[14], "axis_leftz_min");
    }

    #[test]
    fn test_entries_order_trigger() {
        let store = ParameterStore::with_defaults(ControlId::TriggerRight, &defaults());
        assert_eq!(
            store.entries(),
            vec![
                ("trigger_right_antideadzone".to_string(), 0),
                ("trigger_right_deadzone".to_string(), 0),
                ("trigger_right_max".to_string(), 0x755),
            ]
        );
    }

    // ==================== Get / Set Tests ====================

    #[test]
    fn test_set_and_get() {
        let mut store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        store.set(Some(SubAxis::Y), Parameter::Center, -7).unwrap();
        assert_eq!(store.get(Some(SubAxis::Y), Parameter::Center), Some(-7));
        assert_eq!(store.get(Some(SubAxis::X), Parameter::Center), Some(0));
    }

    #[test]
    fn test_set_trigger_center_rejected() {
        let mut store = ParameterStore::with_defaults(ControlId::TriggerLeft, &defaults());
        assert!(matches!(
            store.set(None, Parameter::Center, 3),
            Err(GpcalError::InvalidParameter { .. })
        ));
        assert!(store.set(Some(SubAxis::X), Parameter::Max, 3).is_err());
    }

    #[test]
    fn test_get_mismatched_axis_is_none() {
        let store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        assert_eq!(store.get(None, Parameter::Max), None);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_set_axis_validates() {
        let mut store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        let bad = AxisParams {
            antideadzone: 70,
            center: 0,
            deadzone: 66,
            max: 1320,
            min: -1320,
        };
        assert!(store.set_axis(SubAxis::X, bad).is_err());
        assert_eq!(store.axis(SubAxis::X), Some(&AxisParams::defaults(0x580)));

        let good = AxisParams { antideadzone: 52, ..bad };
        store.set_axis(SubAxis::X, good).unwrap();
        assert_eq!(store.axis(SubAxis::X), Some(&good));
    }

    #[test]
    fn test_axis_range_must_straddle_zero() {
        let mut store = ParameterStore::with_defaults(ControlId::AxisRight, &defaults());
        let params = AxisParams {
            antideadzone: 0,
            center: 0,
            deadzone: 0,
            max: 100,
            min: 10,
        };
        assert!(store.set_axis(SubAxis::Y, params).is_err());
    }

    #[test]
    fn test_trigger_deadzone_above_max_rejected() {
        let mut store = ParameterStore::with_defaults(ControlId::TriggerRight, &defaults());
        let params = TriggerParams {
            antideadzone: 0,
            deadzone: 2000,
            max: 1877,
        };
        assert!(store.set_trigger(params).is_err());
    }

    #[test]
    fn test_set_trigger_on_stick_rejected() {
        let mut store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        assert!(store.set_trigger(TriggerParams::defaults(100)).is_err());
    }

    #[test]
    fn test_validate_defaults() {
        for control in ControlId::ALL {
            assert!(ParameterStore::with_defaults(control, &defaults()).validate().is_ok());
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = ParameterStore::with_defaults(ControlId::TriggerLeft, &defaults());
        store
            .set_trigger(TriggerParams {
                antideadzone: 2,
                deadzone: 3,
                max: 1500,
            })
            .unwrap();
        store.reset(&defaults());
        assert_eq!(store, ParameterStore::with_defaults(ControlId::TriggerLeft, &defaults()));
    }

    // ==================== Transport Tests ====================

    #[test]
    fn test_load_reads_every_key() {
        let mut transport = MemoryTransport::seeded(1400, 1800);
        transport.values.insert("axis_lefty_center".to_string(), 12);

        let store = ParameterStore::load(ControlId::AxisLeft, &transport).unwrap();
        assert_eq!(store.get(Some(SubAxis::Y), Parameter::Center), Some(12));
        assert_eq!(store.get(Some(SubAxis::Z), Parameter::Max), Some(1400));
    }

    #[test]
    fn test_load_keeps_out_of_invariant_values() {
        let mut transport = MemoryTransport::seeded(1400, 1800);
        transport.values.insert("trigger_left_deadzone".to_string(), 5000);

        let store = ParameterStore::load(ControlId::TriggerLeft, &transport).unwrap();
        assert_eq!(store.trigger().map(|t| t.deadzone), Some(5000));
    }

    #[test]
    fn test_load_read_error_names_key() {
        let mut transport = MemoryTransport::seeded(1400, 1800);
        transport.set_read_error("trigger_right_max");

        match ParameterStore::load(ControlId::TriggerRight, &transport) {
            Err(GpcalError::StoreIo { key, .. }) => assert_eq!(key, "trigger_right_max"),
            other => panic!("Expected StoreIo error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_with_mock_transport() {
        let mut mock = crate::params::transport::MockParamTransport::new();
        mock.expect_read().returning(|key| Ok(if key.ends_with("_max") { 1700 } else { 0 }));

        let store = ParameterStore::load(ControlId::TriggerLeft, &mock).unwrap();
        assert_eq!(store.trigger(), Some(&TriggerParams::defaults(1700)));
    }

    #[test]
    fn test_apply_writes_all_entries() {
        let mut transport = MemoryTransport::seeded(1000, 1000);
        let store = ParameterStore::with_defaults(ControlId::AxisRight, &defaults());

        store.apply(&mut transport).unwrap();
        assert_eq!(transport.writes.len(), 15);
        assert_eq!(transport.get("axis_rightx_max"), Some(0x580));
        assert_eq!(transport.get("axis_rightz_min"), Some(-0x580));
    }

    #[test]
    fn test_apply_rolls_back_on_write_failure() {
        let mut transport = MemoryTransport::seeded(1000, 1000);
        transport.set_write_error("axis_lefty_center");
        let before = transport.values.clone();

        let store = ParameterStore::with_defaults(ControlId::AxisLeft, &defaults());
        match store.apply(&mut transport) {
            Err(GpcalError::StoreIo { key, .. }) => assert_eq!(key, "axis_lefty_center"),
            other => panic!("Expected StoreIo error, got: {:?}", other),
        }
        assert_eq!(transport.values, before);
    }

    #[test]
    fn test_apply_read_failure_writes_nothing() {
        let mut transport = MemoryTransport::seeded(1000, 1000);
        transport.set_read_error("trigger_left_max");

        let store = ParameterStore::with_defaults(ControlId::TriggerLeft, &defaults());
        assert!(store.apply(&mut transport).is_err());
        assert!(transport.writes.is_empty());
    }
}
