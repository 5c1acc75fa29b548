//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file (or no file at all)
//! yields the stock Retroid Pocket setup.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GpcalError, Result};
use crate::params::transport::DEFAULT_SYSFS_PATH;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gamepad and driver locations
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_sysfs_path")]
    pub sysfs_path: String,

    #[serde(default = "default_gamepad_name")]
    pub gamepad_name: String,

    #[serde(default = "default_input_dir")]
    pub input_dir: String,
}

/// Capture timing, detection tolerance and derivation percentages
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CalibrationConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    #[serde(default = "default_min_dwell_ticks")]
    pub min_dwell_ticks: u64,

    #[serde(default = "default_detection_tolerance_percent")]
    pub detection_tolerance_percent: u32,

    #[serde(default = "default_axis_max_percent")]
    pub axis_max_percent: u32,

    #[serde(default = "default_axis_deadzone_percent")]
    pub axis_deadzone_percent: u32,

    #[serde(default = "default_axis_deadzone_percent_mini")]
    pub axis_deadzone_percent_mini: u32,

    #[serde(default = "default_axis_antideadzone_percent")]
    pub axis_antideadzone_percent: u32,

    #[serde(default = "default_trigger_max_percent")]
    pub trigger_max_percent: u32,

    #[serde(default = "default_trigger_deadzone_percent")]
    pub trigger_deadzone_percent: u32,

    #[serde(default = "default_trigger_antideadzone_percent")]
    pub trigger_antideadzone_percent: u32,
}

/// Reset values written by `reset` and before every capture
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DefaultsConfig {
    #[serde(default = "default_axis_max")]
    pub axis_max: i32,

    #[serde(default = "default_trigger_max")]
    pub trigger_max: i32,
}

/// Saved script location
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct OutputConfig {
    /// Directory for timestamped scripts; empty means `$HOME`
    #[serde(default)]
    pub save_dir: String,
}

/// Log file output
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; empty logs to stderr only
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_sysfs_path() -> String { DEFAULT_SYSFS_PATH.to_string() }
fn default_gamepad_name() -> String { "Retroid Pocket Gamepad".to_string() }
fn default_input_dir() -> String { "/dev/input".to_string() }

fn default_tick_rate_hz() -> u32 { 60 }
fn default_min_dwell_ticks() -> u64 { 30 }
fn default_detection_tolerance_percent() -> u32 { 10 }
fn default_axis_max_percent() -> u32 { 95 }
fn default_axis_deadzone_percent() -> u32 { 150 }
fn default_axis_deadzone_percent_mini() -> u32 { 5 }
fn default_axis_antideadzone_percent() -> u32 { 80 }
fn default_trigger_max_percent() -> u32 { 100 }
fn default_trigger_deadzone_percent() -> u32 { 105 }
fn default_trigger_antideadzone_percent() -> u32 { 80 }

fn default_axis_max() -> i32 { 0x580 }
fn default_trigger_max() -> i32 { 0x755 }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sysfs_path: default_sysfs_path(),
            gamepad_name: default_gamepad_name(),
            input_dir: default_input_dir(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            min_dwell_ticks: default_min_dwell_ticks(),
            detection_tolerance_percent: default_detection_tolerance_percent(),
            axis_max_percent: default_axis_max_percent(),
            axis_deadzone_percent: default_axis_deadzone_percent(),
            axis_deadzone_percent_mini: default_axis_deadzone_percent_mini(),
            axis_antideadzone_percent: default_axis_antideadzone_percent(),
            trigger_max_percent: default_trigger_max_percent(),
            trigger_deadzone_percent: default_trigger_deadzone_percent(),
            trigger_antideadzone_percent: default_trigger_antideadzone_percent(),
        }
    }
}

impl CalibrationConfig {
    /// Wall-clock length of one tick
    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            axis_max: default_axis_max(),
            trigger_max: default_trigger_max(),
        }
    }
}

impl OutputConfig {
    /// Resolved directory for saved scripts
    pub fn save_dir(&self) -> PathBuf {
        if self.save_dir.is_empty() {
            std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_dir)
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> GpcalError {
    GpcalError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gpcal::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Device locations
        if self.device.sysfs_path.is_empty() {
            return Err(invalid("sysfs_path cannot be empty"));
        }
        if self.device.gamepad_name.is_empty() {
            return Err(invalid("gamepad_name cannot be empty"));
        }
        if self.device.input_dir.is_empty() {
            return Err(invalid("input_dir cannot be empty"));
        }

        // Timing
        let cal = &self.calibration;
        if cal.tick_rate_hz == 0 || cal.tick_rate_hz > 1000 {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        // Percentages
        if cal.detection_tolerance_percent == 0 || cal.detection_tolerance_percent > 100 {
            return Err(invalid("detection_tolerance_percent must be between 1 and 100"));
        }
        if cal.axis_max_percent == 0 || cal.axis_max_percent > 100 {
            return Err(invalid("axis_max_percent must be between 1 and 100"));
        }
        if cal.trigger_max_percent == 0 || cal.trigger_max_percent > 100 {
            return Err(invalid("trigger_max_percent must be between 1 and 100"));
        }
        if cal.axis_deadzone_percent > 1000 {
            return Err(invalid("axis_deadzone_percent must be at most 1000"));
        }
        if cal.axis_deadzone_percent_mini > 100 {
            return Err(invalid("axis_deadzone_percent_mini must be at most 100"));
        }
        for (name, value) in [
            ("axis_antideadzone_percent", cal.axis_antideadzone_percent),
            ("trigger_antideadzone_percent", cal.trigger_antideadzone_percent),
        ] {
            if value > 100 {
                return Err(invalid(format!("{} must be between 0 and 100", name)));
            }
        }
        if cal.trigger_deadzone_percent < 100 || cal.trigger_deadzone_percent > 200 {
            return Err(invalid("trigger_deadzone_percent must be between 100 and 200"));
        }

        // Reset values
        if self.defaults.axis_max <= 0 {
            return Err(invalid("defaults axis_max must be greater than 0"));
        }
        if self.defaults.trigger_max <= 0 {
            return Err(invalid("defaults trigger_max must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[device]
sysfs_path = "/tmp/retroid"

[calibration]
min_dwell_ticks = 45

[defaults]
trigger_max = 1800
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.device.sysfs_path, "/tmp/retroid");
        assert_eq!(config.device.gamepad_name, "Retroid Pocket Gamepad");
        assert_eq!(config.calibration.min_dwell_ticks, 45);
        assert_eq!(config.calibration.tick_rate_hz, 60);
        assert_eq!(config.defaults.trigger_max, 1800);
        assert_eq!(config.defaults.axis_max, 0x580);
    }

    #[test]
    fn test_load_empty_file_gives_defaults() {
        use tempfile::NamedTempFile;

        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[calibration\ntick_rate_hz = ").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(GpcalError::Config(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[calibration]\ntick_rate_hz = 0\n").unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/gpcal.toml"),
            Err(GpcalError::Io(_))
        ));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        assert_eq!(Config::load(path).unwrap(), Config::default());
    }

    #[test]
    fn test_empty_sysfs_path() {
        let mut config = create_valid_config();
        config.device.sysfs_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_gamepad_name() {
        let mut config = create_valid_config();
        config.device.gamepad_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_rate_zero() {
        let mut config = create_valid_config();
        config.calibration.tick_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_rate_too_high() {
        let mut config = create_valid_config();
        config.calibration.tick_rate_hz = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tolerance_zero() {
        let mut config = create_valid_config();
        config.calibration.detection_tolerance_percent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_axis_max_percent_too_high() {
        let mut config = create_valid_config();
        config.calibration.axis_max_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_antideadzone_percent_too_high() {
        let mut config = create_valid_config();
        config.calibration.axis_antideadzone_percent = 120;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.calibration.trigger_antideadzone_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trigger_deadzone_percent_below_100() {
        let mut config = create_valid_config();
        config.calibration.trigger_deadzone_percent = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_must_be_positive() {
        let mut config = create_valid_config();
        config.defaults.axis_max = 0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.defaults.trigger_max = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval() {
        let config = create_valid_config();
        assert_eq!(config.calibration.tick_interval(), Duration::from_micros(16_666));
    }

    #[test]
    fn test_save_dir_explicit() {
        let output = OutputConfig {
            save_dir: "/tmp/cal".to_string(),
        };
        assert_eq!(output.save_dir(), PathBuf::from("/tmp/cal"));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_sysfs_path(), "/sys/module/retroid/parameters");
        assert_eq!(default_input_dir(), "/dev/input");
        assert_eq!(default_tick_rate_hz(), 60);
        assert_eq!(default_min_dwell_ticks(), 30);
        assert_eq!(default_detection_tolerance_percent(), 10);
        assert_eq!(default_axis_max_percent(), 95);
        assert_eq!(default_axis_deadzone_percent(), 150);
        assert_eq!(default_axis_deadzone_percent_mini(), 5);
        assert_eq!(default_axis_antideadzone_percent(), 80);
        assert_eq!(default_trigger_max_percent(), 100);
        assert_eq!(default_trigger_deadzone_percent(), 105);
        assert_eq!(default_trigger_antideadzone_percent(), 80);
        assert_eq!(default_axis_max(), 1408);
        assert_eq!(default_trigger_max(), 1877);
    }
}
