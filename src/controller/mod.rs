//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Mapping raw axis events to calibrated inputs
//! - Tracking live values and observed ranges

pub mod gamepad;
pub mod live;
pub mod mapper;

pub use gamepad::Gamepad;
pub use live::{LiveState, Measurement, NavInput, RawSample};
pub use mapper::EventMapper;
