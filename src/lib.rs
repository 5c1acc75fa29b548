//! # GPcal Library
//!
//! Stick and trigger calibration for the Retroid Pocket 5/Mini gamepad.
//!
//! This library captures held extremes and rest positions from the gamepad,
//! derives the driver's range, center, deadzone and antideadzone parameters,
//! and applies them through the driver's sysfs module parameters.

pub mod args;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod error;
pub mod params;
pub mod snapshot;
