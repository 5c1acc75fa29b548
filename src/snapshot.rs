//! # Parameter Snapshot
//!
//! Side-by-side view of the raw measurements and the calibration parameters
//! of every calibrated input. Renders as a fixed-width table and serializes
//! to JSON.
//!
//! The truncated ("SDL") view clamps the live value into the calibrated
//! range, which is what applications reading the gamepad through SDL see.

use std::fmt;

use serde::Serialize;

use crate::controller::live::LiveState;
use crate::params::control::ControlId;
use crate::params::device::DeviceCalibration;

const LABEL_WIDTH: usize = 15;

/// One calibrated input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRow {
    /// `stickleft.x`, `triggerright`, ...
    pub label: String,
    pub value: Option<i32>,
    pub measured_min: Option<i32>,
    pub measured_max: Option<i32>,
    /// Not applicable to triggers
    pub center: Option<i32>,
    pub deadzone: i32,
    pub antideadzone: i32,
    /// Not applicable to triggers
    pub min: Option<i32>,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Live values are clamped to the calibrated range
    pub truncated: bool,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    /// Collects one row per stick x/y axis and per trigger
    #[must_use]
    pub fn capture(device: &DeviceCalibration, live: &LiveState, truncate: bool) -> Self {
        let mut rows = Vec::new();

        for control in ControlId::ALL {
            let store = device.store(control);
            for &sub_axis in control.calibrated_axes() {
                let measurement = live.measurement(control, sub_axis);

                let row = match sub_axis {
                    Some(axis) => {
                        let Some(p) = store.axis(axis) else { continue };
                        SnapshotRow {
                            label: format!("{}.{}", control.label(), axis.as_str()),
                            value: clamp(measurement.value, p.min, p.max, truncate),
                            measured_min: measurement.min,
                            measured_max: measurement.max,
                            center: Some(p.center),
                            deadzone: p.deadzone,
                            antideadzone: p.antideadzone,
                            min: Some(p.min),
                            max: p.max,
                        }
                    }
                    None => {
                        let Some(p) = store.trigger() else { continue };
                        SnapshotRow {
                            label: control.label().to_string(),
                            value: clamp(measurement.value, 0, p.max, truncate),
                            measured_min: measurement.min,
                            measured_max: measurement.max,
                            center: None,
                            deadzone: p.deadzone,
                            antideadzone: p.antideadzone,
                            min: None,
                            max: p.max,
                        }
                    }
                };
                rows.push(row);
            }
        }

        Self { truncated: truncate, rows }
    }

    /// Row by label
    #[must_use]
    pub fn row(&self, label: &str) -> Option<&SnapshotRow> {
        self.rows.iter().find(|row| row.label == label)
    }
}

fn clamp(value: Option<i32>, low: i32, high: i32, truncate: bool) -> Option<i32> {
    match value {
        Some(v) if truncate && low <= high => Some(v.clamp(low, high)),
        other => other,
    }
}

fn cell(value: Option<i32>) -> String {
    match value {
        Some(v) => format!("{:>5}", v),
        None => format!("{:^5}", "n/a"),
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = if self.truncated { "raw (SDL view)" } else { "raw measurements" };
        writeln!(f, "{:^w$}|{:^17}|{:^29}|", "", view, "calibration", w = LABEL_WIDTH)?;
        writeln!(
            f,
            "{:^w$}|{:^5}|{:^5}|{:^5}|{:^5}|{:^5}|{:^5}|{:^5}|{:^5}|",
            "axis",
            "value",
            "min",
            "max",
            "centr",
            "dzone",
            "adzon",
            "min",
            "max",
            w = LABEL_WIDTH
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<w$}|{}|{}|{}|{}|{}|{}|{}|{}|",
                row.label,
                cell(row.value),
                cell(row.measured_min),
                cell(row.measured_max),
                cell(row.center),
                cell(Some(row.deadzone)),
                cell(Some(row.antideadzone)),
                cell(row.min),
                cell(Some(row.max)),
                w = LABEL_WIDTH
            )?;
        }
        Ok(())
    }
}
