//! # Calibration Parameters
//!
//! Typed parameter sets for each control, the whole-device aggregate, the key/value
//! transport to the driver, and saved calibration scripts.

pub mod control;
pub mod device;
pub mod script;
pub mod store;
pub mod transport;

pub use control::{ControlId, Parameter, SubAxis};
pub use device::DeviceCalibration;
pub use store::{AxisParams, ParameterStore, TriggerParams};
pub use transport::{ParamTransport, SysfsTransport};
