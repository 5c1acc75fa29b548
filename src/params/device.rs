//! # Device Calibration
//!
//! Whole-device parameter set: one [`ParameterStore`] per control plus the
//! driver's `update_params` flag.
//!
//! A calibration session keeps a clone of this value as its backup, so
//! writes made while a run is in progress are never visible through it.

use serde::Serialize;
use tracing::{debug, info};

use super::control::{parse_key, ControlId, UPDATE_PARAMS_KEY};
use super::store::ParameterStore;
use super::transport::ParamTransport;
use crate::config::DefaultsConfig;
use crate::error::{GpcalError, Result};

/// Calibration parameters of every control on the gamepad
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCalibration {
    stores: [ParameterStore; 4],
    update_flag: i32,
}

impl DeviceCalibration {
    /// Creates a device calibration holding reset values only
    pub fn with_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            stores: ControlId::ALL.map(|control| ParameterStore::with_defaults(control, defaults)),
            update_flag: 0,
        }
    }

    /// Loads the current parameters of every control
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::StoreIo`] for the first key that cannot be read.
    pub fn load<T: ParamTransport + ?Sized>(transport: &T) -> Result<Self> {
        let stores = [
            ParameterStore::load(ControlId::AxisLeft, transport)?,
            ParameterStore::load(ControlId::AxisRight, transport)?,
            ParameterStore::load(ControlId::TriggerLeft, transport)?,
            ParameterStore::load(ControlId::TriggerRight, transport)?,
        ];
        let update_flag = transport.read(UPDATE_PARAMS_KEY)?;

        info!("Loaded device calibration");
        Ok(Self { stores, update_flag })
    }

    /// Parameters of one control
    pub fn store(&self, control: ControlId) -> &ParameterStore {
        &self.stores[Self::index(control)]
    }

    /// Mutable parameters of one control
    pub fn store_mut(&mut self, control: ControlId) -> &mut ParameterStore {
        &mut self.stores[Self::index(control)]
    }

    fn index(control: ControlId) -> usize {
        match control {
            ControlId::AxisLeft => 0,
            ControlId::AxisRight => 1,
            ControlId::TriggerLeft => 2,
            ControlId::TriggerRight => 3,
        }
    }

    /// Last known value of the `update_params` flag
    pub fn update_flag(&self) -> i32 {
        self.update_flag
    }

    /// All parameter key/value pairs in canonical order
    /// (axis_left, axis_right, trigger_left, trigger_right).
    ///
    /// The `update_params` flag is not included.
    pub fn entries(&self) -> Vec<(String, i32)> {
        self.stores.iter().flat_map(ParameterStore::entries).collect()
    }

    /// Sets one parameter by its transport key
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::InvalidParameter`] for keys that are not
    /// calibration parameters.
    pub fn set_entry(&mut self, key: &str, value: i32) -> Result<()> {
        if key == UPDATE_PARAMS_KEY {
            self.update_flag = value;
            return Ok(());
        }

        let (control, sub_axis, param) = parse_key(key).ok_or_else(|| GpcalError::InvalidParameter {
            key: key.to_string(),
            reason: "not a calibration parameter".to_string(),
        })?;
        self.store_mut(control).set(sub_axis, param, value)
    }

    /// Restores the reset values of one control
    pub fn reset_control(&mut self, control: ControlId, defaults: &DefaultsConfig) {
        debug!("Resetting {} to defaults", control);
        self.store_mut(control).reset(defaults);
    }

    /// Restores the reset values of every control
    pub fn reset_all(&mut self, defaults: &DefaultsConfig) {
        for control in ControlId::ALL {
            self.reset_control(control, defaults);
        }
    }

    /// Deep copy used to undo a calibration run
    pub fn backup(&self) -> Self {
        self.clone()
    }

    /// Replaces every parameter with the backed-up values
    pub fn restore(&mut self, backup: Self) {
        *self = backup;
    }

    /// Pushes every control to the device, then raises `update_params`
    ///
    /// Each control is written all-or-nothing (see [`ParameterStore::apply`]).
    /// The update flag is only written once every control succeeded.
    ///
    /// # Errors
    ///
    /// Returns the [`GpcalError::StoreIo`] of the first failing key.
    pub fn apply<T: ParamTransport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        for store in &self.stores {
            store.apply(transport)?;
        }
        transport.write(UPDATE_PARAMS_KEY, 1)?;
        self.update_flag = 1;

        info!("Applied calibration to device");
        Ok(())
    }
}
