//! # Calibration Session
//!
//! Orchestrates one calibration run at a time:
//!
//! ```text
//! Idle -> AwaitingTargetSelection -> Capturing(control) -> Idle
//!                                        |  completed: applied
//!                                        |  cancelled: backup restored
//! ```
//!
//! Starting a run clones the whole [`DeviceCalibration`] as a backup, resets
//! the chosen control to its defaults and applies them, and locks target
//! selection. Cancelling puts the backup back verbatim; completing applies the
//! derived parameters and drops the backup.

use tracing::{info, warn};

use super::machine::{CalibrationStateMachine, MachineEvent};
use super::selection::{PanelEntry, Selector};
use crate::config::{CalibrationConfig, DefaultsConfig};
use crate::controller::live::LiveState;
use crate::error::{GpcalError, Result};
use crate::params::control::ControlId;
use crate::params::device::DeviceCalibration;
use crate::params::transport::ParamTransport;
use crate::snapshot::Snapshot;

/// Signals for the operator-facing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Human-readable instruction or status
    Progress(String),
    /// The control was calibrated and applied
    Completed(ControlId),
    /// The run was abandoned and the previous parameters restored
    Cancelled(ControlId),
}

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    AwaitingTargetSelection,
    Capturing(CalibrationStateMachine),
}

/// Owns the device calibration and its transport for the lifetime of the tool
pub struct CalibrationSession<T: ParamTransport> {
    device: DeviceCalibration,
    transport: T,
    calibration: CalibrationConfig,
    defaults: DefaultsConfig,
    selector: Selector<PanelEntry>,
    state: SessionState,
    backup: Option<DeviceCalibration>,
    tick: u64,
    events: Vec<SessionEvent>,
}

impl<T: ParamTransport> CalibrationSession<T> {
    pub fn new(
        device: DeviceCalibration,
        transport: T,
        calibration: CalibrationConfig,
        defaults: DefaultsConfig,
    ) -> Self {
        Self {
            device,
            transport,
            calibration,
            defaults,
            selector: Selector::new(PanelEntry::default_panel()),
            state: SessionState::Idle,
            backup: None,
            tick: 0,
            events: Vec::new(),
        }
    }

    /// Creates a session around the parameters currently on the device
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::StoreIo`] if the parameters cannot be read.
    pub fn load(transport: T, calibration: CalibrationConfig, defaults: DefaultsConfig) -> Result<Self> {
        let device = DeviceCalibration::load(&transport)?;
        Ok(Self::new(device, transport, calibration, defaults))
    }

    pub fn device(&self) -> &DeviceCalibration {
        &self.device
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selector(&self) -> &Selector<PanelEntry> {
        &self.selector
    }

    /// Control being captured, if any
    pub fn active_control(&self) -> Option<ControlId> {
        match &self.state {
            SessionState::Capturing(machine) => Some(machine.control()),
            _ => None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.state, SessionState::Capturing(_))
    }

    /// Ticks evaluated so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Opens the target-selection panel
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::Session`] while a capture is running.
    pub fn begin_selection(&mut self) -> Result<()> {
        if self.is_capturing() {
            return Err(GpcalError::Session("calibration already running".to_string()));
        }
        self.selector.set_enabled(true);
        self.state = SessionState::AwaitingTargetSelection;
        Ok(())
    }

    /// Moves the selection cursor; ignored while selection is locked
    pub fn select_next(&mut self, shift: isize) -> Option<&PanelEntry> {
        self.selector.select_next(shift)
    }

    /// Starts calibrating the control under the cursor
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::Session`] outside target selection or when the
    /// cursor is not on a control, or the error of [`Self::start`].
    pub fn confirm_selection(&mut self) -> Result<ControlId> {
        if !matches!(self.state, SessionState::AwaitingTargetSelection) {
            return Err(GpcalError::Session("no target selection in progress".to_string()));
        }
        let control = match self.selector.selected() {
            Some(PanelEntry::Control(control)) => *control,
            _ => return Err(GpcalError::Session("no control selected".to_string())),
        };
        self.start(control)?;
        Ok(control)
    }

    /// Starts calibrating `control`
    ///
    /// Captures are checked against the measured ranges of the [`LiveState`]
    /// passed to [`Self::tick`]; reset them for `control` before the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`GpcalError::Session`] if a capture is already running, or the
    /// transport error if the reset values cannot be applied. On error the
    /// session is back to `Idle` with the previous parameters in place.
    pub fn start(&mut self, control: ControlId) -> Result<()> {
        if let SessionState::Capturing(machine) = &self.state {
            return Err(GpcalError::Session(format!(
                "{} calibration already running",
                machine.control()
            )));
        }

        let backup = self.device.backup();
        self.device.reset_control(control, &self.defaults);
        if let Err(e) = self.device.apply(&mut self.transport) {
            warn!("Could not apply reset values for {}: {}", control, e);
            self.device.restore(backup);
            self.state = SessionState::Idle;
            self.selector.set_enabled(true);
            return Err(e);
        }

        self.backup = Some(backup);
        self.selector.set_enabled(false);
        self.state = SessionState::Capturing(CalibrationStateMachine::new(control, &self.calibration));
        info!("Started calibration of {}", control);
        Ok(())
    }

    /// Advances the session by one tick using the latest live values
    ///
    /// # Errors
    ///
    /// Returns the transport error if applying the finished calibration fails.
    /// The backup is restored and the session returns to `Idle`.
    pub fn tick(&mut self, live: &LiveState) -> Result<()> {
        self.tick += 1;

        let SessionState::Capturing(machine) = &mut self.state else {
            return Ok(());
        };
        let control = machine.control();

        let events = match machine.tick(self.tick, live, self.device.store_mut(control)) {
            Ok(events) => events,
            Err(e) => {
                self.abort(control);
                return Err(e);
            }
        };

        let mut completed = false;
        for event in events {
            match event {
                MachineEvent::Prompt(text) => self.events.push(SessionEvent::Progress(text)),
                MachineEvent::Restarted { sub_axis, reason } => {
                    let axis = sub_axis.map_or("trigger", |a| a.as_str());
                    self.events.push(SessionEvent::Progress(format!(
                        "Inconsistent captures ({}), calibrating {} again",
                        reason, axis
                    )));
                }
                MachineEvent::Completed => completed = true,
                MachineEvent::Captured { .. } | MachineEvent::Derived { .. } => {}
            }
        }

        if completed {
            self.complete(control)?;
        }
        Ok(())
    }

    fn complete(&mut self, control: ControlId) -> Result<()> {
        self.selector.set_enabled(true);

        if let Err(e) = self.device.apply(&mut self.transport) {
            warn!("Applying {} calibration failed: {}", control, e);
            self.abort(control);
            return Err(e);
        }

        self.backup = None;
        self.state = SessionState::Idle;
        self.events.push(SessionEvent::Progress("Calibration done".to_string()));
        self.events.push(SessionEvent::Completed(control));
        info!("Calibration of {} completed", control);
        Ok(())
    }

    /// Restores the backup after a fatal error, best effort on the device
    fn abort(&mut self, control: ControlId) {
        if let Some(backup) = self.backup.take() {
            self.device.restore(backup);
            if let Err(e) = self.device.apply(&mut self.transport) {
                warn!("Could not restore previous {} parameters on device: {}", control, e);
            }
        }
        self.state = SessionState::Idle;
        self.selector.set_enabled(true);
    }

    /// Abandons the current run and restores the backup
    ///
    /// Outside a capture this only closes target selection. The in-memory
    /// restore always succeeds; the returned error reports a failure to push
    /// the restored values to the device.
    ///
    /// # Errors
    ///
    /// Returns the transport error of the restoring apply.
    pub fn cancel(&mut self) -> Result<()> {
        let control = match &self.state {
            SessionState::Capturing(machine) => machine.control(),
            _ => {
                self.state = SessionState::Idle;
                self.selector.set_enabled(true);
                return Ok(());
            }
        };

        if let Some(backup) = self.backup.take() {
            self.device.restore(backup);
        }
        self.state = SessionState::Idle;
        self.selector.set_enabled(true);
        self.events.push(SessionEvent::Progress("Calibration cancelled".to_string()));
        self.events.push(SessionEvent::Cancelled(control));
        info!("Calibration of {} cancelled", control);

        self.device.apply(&mut self.transport)
    }

    /// Takes the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current parameters and live values of every control
    pub fn snapshot(&self, live: &LiveState, truncate: bool) -> Snapshot {
        Snapshot::capture(&self.device, live, truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::live::RawSample;
    use crate::params::control::{Parameter, SubAxis, UPDATE_PARAMS_KEY};
    use crate::params::store::{AxisParams, ParameterStore, TriggerParams};
    use crate::params::transport::mocks::MemoryTransport;

    const HOLD: u32 = 40;

    fn session() -> CalibrationSession<MemoryTransport> {
        let mut transport = MemoryTransport::seeded(1300, 1700);
        transport.values.insert("axis_leftx_center".to_string(), 12);
        transport.values.insert("axis_leftx_deadzone".to_string(), 70);
        transport.values.insert("axis_leftx_antideadzone".to_string(), 50);
        CalibrationSession::load(transport, CalibrationConfig::default(), DefaultsConfig::default()).unwrap()
    }

    fn hold(
        session: &mut CalibrationSession<MemoryTransport>,
        live: &mut LiveState,
        control: ControlId,
        sub_axis: Option<SubAxis>,
        value: i32,
    ) -> Result<()> {
        for _ in 0..HOLD {
            live.ingest(RawSample {
                control,
                sub_axis,
                value,
            });
            session.tick(live)?;
        }
        Ok(())
    }

    fn stick_axis(
        session: &mut CalibrationSession<MemoryTransport>,
        live: &mut LiveState,
        control: ControlId,
        sub_axis: SubAxis,
    ) -> Result<()> {
        for (extreme, rest) in [(1400, 0), (-1390, 0)] {
            for _ in 0..3 {
                hold(session, live, control, Some(sub_axis), extreme)?;
                hold(session, live, control, Some(sub_axis), rest)?;
            }
        }
        Ok(())
    }

    fn param_values(transport: &MemoryTransport) -> Vec<(String, i32)> {
        transport
            .values
            .iter()
            .filter(|(key, _)| key.as_str() != UPDATE_PARAMS_KEY)
            .map(|(key, value)| (key.clone(), *value))
            .collect()
    }

    // ==================== Start Tests ====================

    #[test]
    fn test_start_resets_and_applies_control() {
        let mut session = session();
        session.start(ControlId::AxisLeft).unwrap();

        let defaults = ParameterStore::with_defaults(ControlId::AxisLeft, &DefaultsConfig::default());
        assert_eq!(session.device().store(ControlId::AxisLeft), &defaults);
        assert_eq!(session.transport().get("axis_leftx_center"), Some(0));
        assert_eq!(session.transport().get("axis_leftx_max"), Some(0x580));
        assert_eq!(session.transport().get(UPDATE_PARAMS_KEY), Some(1));
        // Other controls keep their values
        assert_eq!(session.transport().get("axis_rightx_max"), Some(1300));

        assert!(session.is_capturing());
        assert_eq!(session.active_control(), Some(ControlId::AxisLeft));
        assert!(!session.selector().is_enabled());
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = session();
        session.start(ControlId::AxisLeft).unwrap();
        assert!(matches!(
            session.start(ControlId::TriggerLeft),
            Err(GpcalError::Session(_))
        ));
        assert_eq!(session.active_control(), Some(ControlId::AxisLeft));
    }

    #[test]
    fn test_start_apply_failure_keeps_parameters() {
        let mut session = session();
        let before = session.device().clone();
        session.transport.set_write_error("axis_lefty_max");

        assert!(matches!(
            session.start(ControlId::AxisLeft),
            Err(GpcalError::StoreIo { .. })
        ));
        assert_eq!(session.device(), &before);
        assert_eq!(session.transport().get("axis_leftx_center"), Some(12));
        assert!(!session.is_capturing());
        assert!(session.selector().is_enabled());
    }

    // ==================== Selection Tests ====================

    #[test]
    fn test_selection_flow() {
        let mut session = session();
        session.begin_selection().unwrap();
        session.select_next(1);
        session.select_next(1);

        assert_eq!(session.confirm_selection().unwrap(), ControlId::AxisRight);
        assert_eq!(session.active_control(), Some(ControlId::AxisRight));

        // Selection is locked while capturing
        assert_eq!(session.select_next(1), Some(&PanelEntry::Control(ControlId::AxisRight)));
        assert!(session.begin_selection().is_err());
    }

    #[test]
    fn test_confirm_without_selection_mode() {
        let mut session = session();
        assert!(matches!(session.confirm_selection(), Err(GpcalError::Session(_))));
    }

    #[test]
    fn test_cancel_closes_selection() {
        let mut session = session();
        session.begin_selection().unwrap();
        session.cancel().unwrap();
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.drain_events().is_empty());
    }

    // ==================== Completion Tests ====================

    #[test]
    fn test_full_stick_calibration() {
        let mut session = session();
        let mut live = LiveState::new();
        session.start(ControlId::AxisLeft).unwrap();

        stick_axis(&mut session, &mut live, ControlId::AxisLeft, SubAxis::X).unwrap();
        stick_axis(&mut session, &mut live, ControlId::AxisLeft, SubAxis::Y).unwrap();

        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.selector().is_enabled());

        let events = session.drain_events();
        assert_eq!(
            events.first(),
            Some(&SessionEvent::Progress(
                "Step 1/12: Push stick full right few seconds and release".to_string()
            ))
        );
        assert_eq!(events.last(), Some(&SessionEvent::Completed(ControlId::AxisLeft)));

        assert_eq!(session.transport().get("axis_leftx_max"), Some(1320));
        assert_eq!(session.transport().get("axis_lefty_min"), Some(-1320));
        assert_eq!(session.transport().get("axis_leftx_deadzone"), Some(66));
        assert_eq!(session.transport().get("axis_leftx_antideadzone"), Some(52));
        assert_eq!(session.transport().get("axis_leftx_center"), Some(0));
        assert_eq!(
            session.device().store(ControlId::AxisLeft).axis(SubAxis::Z),
            Some(&AxisParams::defaults(0x580))
        );
    }

    #[test]
    fn test_full_trigger_calibration() {
        let mut session = session();
        let mut live = LiveState::new();
        session.start(ControlId::TriggerRight).unwrap();

        hold(&mut session, &mut live, ControlId::TriggerRight, None, 20).unwrap();
        for _ in 0..3 {
            hold(&mut session, &mut live, ControlId::TriggerRight, None, 1800).unwrap();
            hold(&mut session, &mut live, ControlId::TriggerRight, None, 20).unwrap();
        }

        assert_eq!(
            session.drain_events().last(),
            Some(&SessionEvent::Completed(ControlId::TriggerRight))
        );
        assert_eq!(
            session.device().store(ControlId::TriggerRight).trigger(),
            Some(&TriggerParams {
                antideadzone: 0,
                deadzone: 1,
                max: 1780,
            })
        );
        assert_eq!(session.transport().get("trigger_right_max"), Some(1780));
    }

    #[test]
    fn test_completion_apply_failure_restores_backup() {
        let mut session = session();
        let before = session.device().store(ControlId::AxisLeft).clone();
        let mut live = LiveState::new();
        session.start(ControlId::AxisLeft).unwrap();

        stick_axis(&mut session, &mut live, ControlId::AxisLeft, SubAxis::X).unwrap();
        session.transport.set_write_error("axis_lefty_deadzone");

        let mut result = Ok(());
        for (extreme, rest) in [(1400, 0), (-1390, 0)] {
            for _ in 0..3 {
                for value in [extreme, rest] {
                    if result.is_ok() {
                        result = hold(&mut session, &mut live, ControlId::AxisLeft, Some(SubAxis::Y), value);
                    }
                }
            }
        }

        assert!(matches!(result, Err(GpcalError::StoreIo { key, .. }) if key == "axis_lefty_deadzone"));
        assert!(matches!(session.state(), SessionState::Idle));
        assert_eq!(session.device().store(ControlId::AxisLeft), &before);
        assert!(!session
            .drain_events()
            .contains(&SessionEvent::Completed(ControlId::AxisLeft)));
    }

    // ==================== Cancellation Tests ====================

    #[test]
    fn test_cancel_restores_exactly() {
        let mut session = session();
        let before_device = session.device().clone();
        let before_values = param_values(session.transport());
        let mut live = LiveState::new();

        session.start(ControlId::AxisLeft).unwrap();
        // Finish x (derived values written in memory) and part of y
        stick_axis(&mut session, &mut live, ControlId::AxisLeft, SubAxis::X).unwrap();
        hold(&mut session, &mut live, ControlId::AxisLeft, Some(SubAxis::Y), 1400).unwrap();
        assert_ne!(
            session.device().store(ControlId::AxisLeft).get(Some(SubAxis::X), Parameter::Max),
            before_device.store(ControlId::AxisLeft).get(Some(SubAxis::X), Parameter::Max)
        );

        session.cancel().unwrap();

        assert_eq!(session.device().entries(), before_device.entries());
        assert_eq!(param_values(session.transport()), before_values);
        assert!(matches!(session.state(), SessionState::Idle));
        assert!(session.selector().is_enabled());
        assert_eq!(
            session.drain_events().last(),
            Some(&SessionEvent::Cancelled(ControlId::AxisLeft))
        );
    }

    #[test]
    fn test_cancel_immediately_after_start() {
        let mut session = session();
        let before = session.device().entries();

        session.start(ControlId::TriggerLeft).unwrap();
        session.cancel().unwrap();
        assert_eq!(session.device().entries(), before);
    }

    #[test]
    fn test_cancel_transport_failure_still_restores_memory() {
        let mut session = session();
        let before = session.device().entries();

        session.start(ControlId::AxisLeft).unwrap();
        session.transport.set_write_error("axis_leftx_center");

        assert!(session.cancel().is_err());
        assert_eq!(session.device().entries(), before);
        assert!(matches!(session.state(), SessionState::Idle));
    }

    #[test]
    fn test_ticks_counted_when_idle() {
        let mut session = session();
        let live = LiveState::new();
        session.tick(&live).unwrap();
        session.tick(&live).unwrap();
        assert_eq!(session.ticks(), 2);
        assert!(session.drain_events().is_empty());
    }
}
