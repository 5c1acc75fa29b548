//! # Calibration Scripts
//!
//! A saved calibration is a plain bash script with one `echo VALUE > ROOT/KEY`
//! line per parameter, in canonical order, followed by the `update_params`
//! write. Running the script re-applies the calibration without this tool;
//! [`parse`] reads it back.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::control::{parse_key, UPDATE_PARAMS_KEY};
use super::device::DeviceCalibration;
use crate::error::{GpcalError, Result};

const HEADER: &str = "#!/usr/bin/env bash\n\
#\n\
# Retroid Pocket 5/Mini gamepad calibration\n\
# Generated by gpcal\n\
#\n";

/// Renders the script that writes `device` into the parameter directory `root`
pub fn render(device: &DeviceCalibration, root: &Path) -> String {
    let root = root.display();
    let mut script = String::from(HEADER);
    for (key, value) in device.entries() {
        script.push_str(&format!("echo {} > {}/{}\n", value, root, key));
    }
    script.push_str(&format!("echo 1 > {}/{}\n", root, UPDATE_PARAMS_KEY));
    script
}

/// File name of a script saved at `at`, e.g. `GPcal-2024-05-01-18h42.sh`
pub fn script_file_name(at: NaiveDateTime) -> String {
    format!("GPcal-{}.sh", at.format("%Y-%m-%d-%Hh%M"))
}

/// Timestamped script path inside `dir`, using the local time
pub fn default_script_path(dir: &Path) -> PathBuf {
    dir.join(script_file_name(chrono::Local::now().naive_local()))
}

/// Writes the script for `device` to `path` and marks it executable
///
/// # Errors
///
/// Returns [`GpcalError::Io`] if the file cannot be written.
pub fn save(device: &DeviceCalibration, root: &Path, path: &Path) -> Result<()> {
    fs::write(path, render(device, root))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    info!("Calibration saved to {}", path.display());
    Ok(())
}

/// Parses a saved script into `(key, value)` pairs, in file order
///
/// Blank lines and `#` comments are skipped. Every other line must be
/// `echo VALUE > PATH` where the last path component is a parameter key or
/// `update_params`.
///
/// # Errors
///
/// Returns [`GpcalError::Script`] with the 1-based line number of the first
/// malformed line.
pub fn parse(text: &str) -> Result<Vec<(String, i32)>> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let err = |reason: String| GpcalError::Script { line: index + 1, reason };

        let rest = line
            .strip_prefix("echo ")
            .ok_or_else(|| err(format!("expected 'echo VALUE > PATH', got '{}'", line)))?;
        let (value, target) = rest
            .split_once('>')
            .ok_or_else(|| err("missing '>' redirection".to_string()))?;

        let value: i32 = value
            .trim()
            .parse()
            .map_err(|e| err(format!("'{}' is not an integer: {}", value.trim(), e)))?;

        let key = Path::new(target.trim())
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| err(format!("no parameter name in '{}'", target.trim())))?;

        if key != UPDATE_PARAMS_KEY && parse_key(key).is_none() {
            return Err(err(format!("unknown parameter '{}'", key)));
        }

        entries.push((key.to_string(), value));
    }

    Ok(entries)
}

/// Loads the script at `path` into `device`
///
/// Nothing is changed in `device` unless the whole script parses and every
/// entry is accepted. Returns the number of entries applied.
///
/// # Errors
///
/// Returns [`GpcalError::Io`] if the file cannot be read, or
/// [`GpcalError::Script`] / [`GpcalError::InvalidParameter`] for bad content.
pub fn load(device: &mut DeviceCalibration, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let entries = parse(&text)?;

    let mut updated = device.clone();
    for (key, value) in &entries {
        updated.set_entry(key, *value)?;
    }
    *device = updated;

    info!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries.len())
}
