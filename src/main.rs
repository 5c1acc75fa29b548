//! # GPcal
//!
//! Calibrate the Retroid Pocket 5/Mini sticks and triggers.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse arguments and load the configuration
//!    - Set up logging (stderr, plus a daily log file when configured)
//!
//! 2. **Command**
//!    - `show`, `save`, `reset`, `load` work on the driver parameters only
//!    - `monitor` and `calibrate` open the gamepad and run a tick loop at
//!      `tick_rate_hz`, fed by the evdev event stream
//!
//! 3. **Shutdown**
//!    - Ctrl+C or the B button cancels a running calibration and restores
//!      the previous parameters
//!
//! # Examples
//!
//! ```bash
//! gpcal show --truncate
//! gpcal calibrate stickleft
//! gpcal save -o ~/calibration.sh
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use gpcal::args::{Args, Command};
use gpcal::calibration::selection::PanelEntry;
use gpcal::calibration::{CalibrationSession, SessionEvent, SessionState};
use gpcal::config::{Config, LoggingConfig};
use gpcal::controller::{EventMapper, Gamepad, LiveState, NavInput};
use gpcal::error::GpcalError;
use gpcal::params::control::ControlId;
use gpcal::params::{script, DeviceCalibration, ParamTransport, SysfsTransport};
use gpcal::snapshot::Snapshot;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        Config::load(&args.config).with_context(|| format!("Failed to load {}", args.config.display()))?
    } else {
        Config::default()
    };

    let _guard = init_logging(&config.logging);
    info!("GPcal v{} starting...", env!("CARGO_PKG_VERSION"));
    if !args.config.exists() {
        debug!("{} not found, using built-in defaults", args.config.display());
    }

    let mut transport = SysfsTransport::new(&config.device.sysfs_path);

    match args.command {
        Command::Show { json, truncate } => show(&transport, json, truncate),
        Command::Save { output } => {
            let device = DeviceCalibration::load(&transport)?;
            let path = output.unwrap_or_else(|| script::default_script_path(&config.output.save_dir()));
            script::save(&device, transport.root(), &path)?;
            println!("Calibration saved to {}", path.display());
            Ok(())
        }
        Command::Reset { control } => {
            let mut device = DeviceCalibration::load(&transport)?;
            match control {
                Some(control) => device.reset_control(control, &config.defaults),
                None => device.reset_all(&config.defaults),
            }
            device.apply(&mut transport)?;
            println!("Reset values applied");
            Ok(())
        }
        Command::Load { script: path } => {
            let mut device = DeviceCalibration::load(&transport)?;
            let count = script::load(&mut device, &path)?;
            device.apply(&mut transport)?;
            println!("Applied {} parameters from {}", count, path.display());
            Ok(())
        }
        Command::Monitor { truncate } => monitor(&config, &transport, truncate).await,
        Command::Calibrate { control } => calibrate(&config, transport, control).await,
    }
}

/// Installs the tracing subscriber
///
/// The returned guard flushes the log file on drop and must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_writer(std::io::stderr);

    if config.file_dir.is_empty() {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.file_dir, "gpcal.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

fn show<T: ParamTransport>(transport: &T, json: bool, truncate: bool) -> Result<()> {
    let device = DeviceCalibration::load(transport)?;
    let snapshot = Snapshot::capture(&device, &LiveState::new(), truncate);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", snapshot);
    }
    Ok(())
}

/// Prints live values next to the parameters once per second until Ctrl+C
async fn monitor<T: ParamTransport>(config: &Config, transport: &T, truncate: bool) -> Result<()> {
    let device = DeviceCalibration::load(transport)?;
    let gamepad = Gamepad::open(&config.device.input_dir, &config.device.gamepad_name)?;
    let mut events = gamepad.into_event_stream()?;
    let mut mapper = EventMapper::new();

    let mut ticker = interval(config.calibration.tick_interval());
    let refresh = u64::from(config.calibration.tick_rate_hz);
    let mut ticks: u64 = 0;

    info!("Monitoring, press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if ticks % refresh == 0 {
                    println!("{}", Snapshot::capture(&device, mapper.state(), truncate));
                }
                ticks += 1;
            }

            event = events.next_event() => {
                let event = event.map_err(|e| GpcalError::Controller(format!("Event stream failed: {}", e)))?;
                mapper.process_event(&event);
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}

fn print_panel<T: ParamTransport>(session: &CalibrationSession<T>) {
    let selector = session.selector();
    println!("Select the control to calibrate (D-pad, A to confirm, B to quit):");
    for (index, entry) in selector.entries().iter().enumerate() {
        let marker = if selector.selected_index() == Some(index) { ">" } else { " " };
        match entry {
            PanelEntry::Control(control) => println!(" {} {}", marker, control),
            PanelEntry::Label(text) => println!("   ({})", text),
        }
    }
}

fn start_capture<T: ParamTransport>(
    session: &mut CalibrationSession<T>,
    live: &mut LiveState,
    control: ControlId,
) -> Result<()> {
    session
        .start(control)
        .with_context(|| format!("Failed to start {} calibration", control))?;
    live.reset_measurements(control);
    println!("Calibrating {}. Press B or Ctrl+C to cancel.", control);
    Ok(())
}

/// Prints pending session events; returns true once the run is over
fn report<T: ParamTransport>(session: &mut CalibrationSession<T>, live: &LiveState) -> bool {
    let mut finished = false;
    for event in session.drain_events() {
        match event {
            SessionEvent::Progress(text) => println!("{}", text),
            SessionEvent::Completed(control) => {
                println!("{} calibrated:", control);
                print!("{}", session.snapshot(live, false));
                finished = true;
            }
            SessionEvent::Cancelled(control) => {
                println!("{} calibration cancelled, previous parameters restored", control);
                finished = true;
            }
        }
    }
    finished
}

/// Runs one calibration, either of `control` or of the control picked on the panel
async fn calibrate(config: &Config, transport: SysfsTransport, control: Option<ControlId>) -> Result<()> {
    let gamepad = Gamepad::open(&config.device.input_dir, &config.device.gamepad_name)?;
    let mut events = gamepad.into_event_stream()?;
    let mut mapper = EventMapper::new();
    let mut session = CalibrationSession::load(transport, config.calibration.clone(), config.defaults)?;

    match control {
        Some(control) => start_capture(&mut session, mapper.state_mut(), control)?,
        None => {
            session.begin_selection()?;
            print_panel(&session);
        }
    }

    let mut ticker = interval(config.calibration.tick_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if mapper.state_mut().take_cancel_request() {
                    info!("Cancel requested from the gamepad");
                    let result = session.cancel();
                    report(&mut session, mapper.state());
                    result?;
                    break;
                }

                for input in mapper.state_mut().take_navigation() {
                    if !matches!(session.state(), SessionState::AwaitingTargetSelection) {
                        continue;
                    }
                    match input {
                        NavInput::Previous => {
                            session.select_next(-1);
                            print_panel(&session);
                        }
                        NavInput::Next => {
                            session.select_next(1);
                            print_panel(&session);
                        }
                        NavInput::Confirm => {
                            let control = session.confirm_selection()?;
                            mapper.state_mut().reset_measurements(control);
                            println!("Calibrating {}. Press B or Ctrl+C to cancel.", control);
                        }
                    }
                }

                let result = session.tick(mapper.state());
                let finished = report(&mut session, mapper.state());
                result.context("Calibration aborted, previous parameters restored")?;
                if finished {
                    break;
                }
            }

            event = events.next_event() => {
                match event {
                    Ok(event) => mapper.process_event(&event),
                    Err(e) => {
                        warn!("Gamepad event stream failed: {}", e);
                        let result = session.cancel();
                        report(&mut session, mapper.state());
                        result?;
                        return Err(GpcalError::Controller(format!("Event stream failed: {}", e)).into());
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                let result = session.cancel();
                report(&mut session, mapper.state());
                result?;
                break;
            }
        }
    }

    Ok(())
}
