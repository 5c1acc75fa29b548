//! # Target Selection
//!
//! The panel the operator picks a control from. Entries are a tagged list;
//! only entries that report themselves selectable can receive the cursor.

use crate::params::control::ControlId;

/// Panel order, left to right as the controls sit on the device
pub const PANEL_ORDER: [ControlId; 4] = [
    ControlId::TriggerLeft,
    ControlId::AxisLeft,
    ControlId::AxisRight,
    ControlId::TriggerRight,
];

/// Capability check for panel entries
pub trait Selectable {
    fn is_selectable(&self) -> bool;
}

/// One row of the target-selection panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEntry {
    /// A control that can be calibrated
    Control(ControlId),
    /// Informational text, never selectable
    Label(String),
}

impl Selectable for PanelEntry {
    fn is_selectable(&self) -> bool {
        matches!(self, PanelEntry::Control(_))
    }
}

impl PanelEntry {
    /// Default panel: the four controls in [`PANEL_ORDER`] followed by the SDL view toggle label
    #[must_use]
    pub fn default_panel() -> Vec<PanelEntry> {
        let mut entries: Vec<PanelEntry> = PANEL_ORDER.into_iter().map(PanelEntry::Control).collect();
        entries.push(PanelEntry::Label("SDL".to_string()));
        entries
    }
}

/// Cursor over a list of entries that skips non-selectable ones
///
/// # Examples
///
/// ```
/// use gpcal::calibration::selection::{PanelEntry, Selector};
/// use gpcal::params::control::ControlId;
///
/// let mut selector = Selector::new(PanelEntry::default_panel());
/// assert_eq!(selector.selected(), Some(&PanelEntry::Control(ControlId::TriggerLeft)));
///
/// // Wraps around the label back to the first control
/// for _ in 0..4 {
///     selector.select_next(1);
/// }
/// assert_eq!(selector.selected(), Some(&PanelEntry::Control(ControlId::TriggerLeft)));
/// ```
#[derive(Debug, Clone)]
pub struct Selector<T> {
    entries: Vec<T>,
    selected: Option<usize>,
    enabled: bool,
}

impl<T: Selectable> Selector<T> {
    /// Creates an enabled selector with the cursor on the first selectable entry
    pub fn new(entries: Vec<T>) -> Self {
        let selected = entries.iter().position(Selectable::is_selectable);
        Self {
            entries,
            selected,
            enabled: true,
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.and_then(|index| self.entries.get(index))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Moves the cursor by `shift` entries (wrapping), skipping entries that
    /// are not selectable.
    ///
    /// Visits at most one full lap; if no other entry is selectable the cursor
    /// stays where it is. Does nothing while disabled.
    pub fn select_next(&mut self, shift: isize) -> Option<&T> {
        if !self.enabled || shift == 0 || self.entries.is_empty() {
            return self.selected();
        }

        let len = self.entries.len() as isize;
        let start = self.selected.map_or(-shift.signum(), |index| index as isize);
        let mut index = start;

        for _ in 0..self.entries.len() {
            index = (index + shift).rem_euclid(len);
            if self.entries[index as usize].is_selectable() {
                self.selected = Some(index as usize);
                break;
            }
        }

        self.selected()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
