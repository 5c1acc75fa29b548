//! # Gamepad Module
//!
//! Detects the Retroid Pocket built-in gamepad through the Linux evdev
//! interface and exposes its events as an async stream.
//!
//! The gamepad is identified by its evdev device name (by default
//! `Retroid Pocket Gamepad`).

use evdev::{Device, EventStream};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GpcalError, Result};

/// Retroid Pocket gamepad handle
pub struct Gamepad {
    device: Device,
    device_path: String,
}

impl Gamepad {
    /// Detect and open the gamepad named `name`
    ///
    /// Scans the `event*` devices of `input_dir` in sorted order and opens the
    /// first one whose evdev name matches.
    ///
    /// # Errors
    ///
    /// - `Controller`: `input_dir` is missing or unreadable
    /// - `ControllerNotFound`: no device with that name could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gpcal::controller::gamepad::Gamepad;
    ///
    /// let gamepad = Gamepad::open("/dev/input", "Retroid Pocket Gamepad")?;
    /// println!("Gamepad at: {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(input_dir: P, name: &str) -> Result<Self> {
        let input_dir = input_dir.as_ref();

        if !input_dir.exists() {
            return Err(GpcalError::Controller(format!(
                "{} directory not found",
                input_dir.display()
            )));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| GpcalError::Controller(format!("Failed to read {}: {}", input_dir.display(), e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GpcalError::Controller(format!("Failed to read directory entry: {}", e)))?;

        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|filename| filename.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if device.name() == Some(name) {
                        let device_path = path.to_string_lossy().to_string();
                        info!("Found {} at: {}", name, device_path);
                        return Ok(Gamepad { device, device_path });
                    }
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(GpcalError::ControllerNotFound(name.to_string()))
    }

    /// The `/dev/input/eventX` path this gamepad was opened from
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Converts the handle into a non-blocking tokio event stream
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the device cannot be switched to non-blocking mode.
    pub fn into_event_stream(self) -> Result<EventStream> {
        self.device
            .into_event_stream()
            .map_err(|e| GpcalError::Controller(format!("Failed to open event stream: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_input_dir() {
        assert!(matches!(
            Gamepad::open("/nonexistent/input", "Retroid Pocket Gamepad"),
            Err(GpcalError::Controller(_))
        ));
    }

    #[test]
    fn test_open_without_event_nodes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mouse0"), b"").unwrap();
        std::fs::write(dir.path().join("event0"), b"").unwrap();

        match Gamepad::open(dir.path(), "Retroid Pocket Gamepad") {
            Err(GpcalError::ControllerNotFound(name)) => assert_eq!(name, "Retroid Pocket Gamepad"),
            Err(other) => panic!("Expected ControllerNotFound, got: {:?}", other),
            Ok(_) => panic!("Expected ControllerNotFound"),
        }
    }

    // Integration test - only runs on the device
    #[test]
    #[ignore]
    fn test_open_with_real_hardware() {
        let gamepad = Gamepad::open("/dev/input", "Retroid Pocket Gamepad").unwrap();
        assert!(gamepad.device_path().starts_with("/dev/input/event"));
        assert_eq!(gamepad.name(), Some("Retroid Pocket Gamepad"));
    }

    // Integration test - only runs on the device
    #[tokio::test]
    #[ignore]
    async fn test_event_stream_with_real_hardware() {
        let gamepad = Gamepad::open("/dev/input", "Retroid Pocket Gamepad").unwrap();
        let mut stream = gamepad.into_event_stream().unwrap();

        println!("Move a stick within 5 seconds...");
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next_event())
            .await
            .expect("No events received from gamepad")
            .unwrap();
        println!("Received event: {:?}", event);
    }
}
