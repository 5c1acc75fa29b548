//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::params::control::ControlId;

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gpcal/config.toml";

/// Retroid Pocket 5/Mini gamepad calibration
#[derive(Parser, Debug)]
#[command(name = "gpcal")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (built-in defaults when it does not exist)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print the current calibration parameters
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,

        /// Clamp values to the calibrated range (SDL view)
        #[arg(long)]
        truncate: bool,
    },

    /// Calibrate a control; without CONTROL, pick it with the D-pad and A
    Calibrate {
        /// stickleft, stickright, triggerleft or triggerright
        control: Option<ControlId>,
    },

    /// Stream live values next to the calibration parameters
    Monitor {
        /// Clamp values to the calibrated range (SDL view)
        #[arg(long)]
        truncate: bool,
    },

    /// Write the current parameters as a replayable shell script
    Save {
        /// Output file (default: timestamped file in the save directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore the reset values of one control, or of all controls
    Reset {
        control: Option<ControlId>,
    },

    /// Apply the parameters of a saved calibration script
    Load {
        script: PathBuf,
    },
}
