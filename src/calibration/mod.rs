//! # Calibration Module
//!
//! Capture procedure and session orchestration.
//!
//! This module handles:
//! - Hold detection on a tick clock ([`stability`])
//! - The per-control capture step machine ([`machine`])
//! - Turning captures into driver parameters ([`derive`])
//! - Target selection and the backup/apply/cancel lifecycle ([`selection`], [`session`])

pub mod derive;
pub mod machine;
pub mod selection;
pub mod session;
pub mod stability;

pub use machine::{CalibrationStateMachine, MachineEvent};
pub use session::{CalibrationSession, SessionEvent, SessionState};
