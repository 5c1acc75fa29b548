//! Trait abstraction for parameter reads and writes to enable testing

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{GpcalError, Result};

/// Default location of the gamepad driver's module parameters
pub const DEFAULT_SYSFS_PATH: &str = "/sys/module/retroid/parameters";

/// Trait for key/value parameter I/O with the device driver
#[cfg_attr(test, mockall::automock)]
pub trait ParamTransport {
    /// Read the integer value stored under `key`
    fn read(&self, key: &str) -> Result<i32>;

    /// Write `value` under `key`
    fn write(&mut self, key: &str, value: i32) -> Result<()>;
}

/// Transport backed by one file per parameter (the driver's sysfs directory)
#[derive(Debug, Clone)]
pub struct SysfsTransport {
    root: PathBuf,
}

impl SysfsTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the parameter files
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ParamTransport for SysfsTransport {
    fn read(&self, key: &str) -> Result<i32> {
        let path = self.root.join(key);
        let contents = fs::read_to_string(&path).map_err(|e| GpcalError::store_io(key, e))?;
        let line = contents.lines().next().unwrap_or("").trim();

        line.parse::<i32>().map_err(|e| {
            GpcalError::store_io(
                key,
                io::Error::new(io::ErrorKind::InvalidData, format!("'{}' is not an integer: {}", line, e)),
            )
        })
    }

    fn write(&mut self, key: &str, value: i32) -> Result<()> {
        let path = self.root.join(key);
        fs::write(&path, value.to_string()).map_err(|e| GpcalError::store_io(key, e))?;
        debug!("Wrote {} = {}", key, value);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sysfs_read_trims_newline() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("axis_leftx_max"), "1408\n").unwrap();

        let transport = SysfsTransport::new(dir.path());
        assert_eq!(transport.read("axis_leftx_max").unwrap(), 1408);
    }

    #[test]
    fn test_sysfs_read_negative_value() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("axis_leftx_min"), "-1408\n").unwrap();

        let transport = SysfsTransport::new(dir.path());
        assert_eq!(transport.read("axis_leftx_min").unwrap(), -1408);
    }

    #[test]
    fn test_sysfs_write_then_read() {
        let dir = TempDir::new().unwrap();
        let mut transport = SysfsTransport::new(dir.path());

        transport.write("trigger_left_max", 1877).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("trigger_left_max")).unwrap(), "1877");
        assert_eq!(transport.read("trigger_left_max").unwrap(), 1877);
    }

    #[test]
    fn test_sysfs_missing_key_is_store_io() {
        let dir = TempDir::new().unwrap();
        let transport = SysfsTransport::new(dir.path());

        match transport.read("axis_leftx_center") {
            Err(GpcalError::StoreIo { key, .. }) => assert_eq!(key, "axis_leftx_center"),
            other => panic!("Expected StoreIo error, got: {:?}", other),
        }
    }

    #[test]
    fn test_sysfs_garbage_value_is_store_io() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("axis_leftx_center"), "abc\n").unwrap();
        let transport = SysfsTransport::new(dir.path());

        match transport.read("axis_leftx_center") {
            Err(GpcalError::StoreIo { key, cause }) => {
                assert_eq!(key, "axis_leftx_center");
                assert_eq!(cause.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("Expected StoreIo error, got: {:?}", other),
        }
    }

    #[test]
    fn test_sysfs_write_into_missing_dir_fails() {
        let mut transport = SysfsTransport::new("/nonexistent/gpcal/parameters");
        assert!(matches!(
            transport.write("update_params", 1),
            Err(GpcalError::StoreIo { .. })
        ));
    }

    #[test]
    fn test_memory_transport_records_writes() {
        let mut transport = mocks::MemoryTransport::seeded(0x580, 0x755);
        transport.write("axis_leftx_max", 1320).unwrap();

        assert_eq!(transport.get("axis_leftx_max"), Some(1320));
        assert_eq!(transport.writes, vec![("axis_leftx_max".to_string(), 1320)]);
    }
}
