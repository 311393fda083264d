//! PinPanel: the user-facing set of 26 pin controls.
//!
//! Every control starts disabled.  After connecting, the panel asks the
//! simulator for a sync once and enables each pin the reply reports, setting
//! it to the reported state.  Pins the simulator never mentions stay disabled
//! and cannot be changed.
//!
//! A change to an enabled control is forwarded to the simulator as a pin
//! update carrying the control's one-based pin number (the number in its
//! label).  The local control only changes once the update has been sent.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use gpio_core::{PinIndex, PinSnapshot};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Controls per row when the panel is rendered.
const COLUMNS: usize = 13;

/// Error raised by a [`SimulatorLink`] implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LinkError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl LinkError {
    /// Wraps any error produced by the transport.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

/// Error type for panel operations.
#[derive(Debug, Error)]
pub enum PanelError {
    /// The simulator never reported this pin, so its control is disabled.
    #[error("{0} is disabled: the simulator has not reported it")]
    PinDisabled(PinIndex),
    /// The simulator link failed.
    #[error("simulator link failed: {0}")]
    Link(#[from] LinkError),
}

/// The panel's view of the simulator connection.
///
/// Implemented by the infrastructure layer's `PinConnector`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimulatorLink: Send + Sync {
    /// Asks the simulator for the state of every pin it knows about.
    async fn request_pin_sync(&self) -> Result<PinSnapshot, LinkError>;

    /// Sends the new state of one pin.
    async fn send_pin_state_change(&self, pin: u8, asserted: bool) -> Result<(), LinkError>;
}

/// State of a single pin control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinControl {
    /// Text shown next to the control, e.g. `"Pin 7"`.
    pub label: String,
    /// Whether the simulator has reported this pin.
    pub enabled: bool,
    /// Whether the pin is asserted (checked).
    pub asserted: bool,
}

/// The 26 pin controls plus the link used to keep them in step with the
/// simulator.
pub struct PinPanel {
    controls: Vec<PinControl>,
    link: Option<Arc<dyn SimulatorLink>>,
}

impl Default for PinPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PinPanel {
    /// Creates a panel with every control disabled and deasserted.
    pub fn new() -> Self {
        let controls = PinIndex::all()
            .map(|pin| PinControl {
                label: pin.to_string(),
                enabled: false,
                asserted: false,
            })
            .collect();
        Self { controls, link: None }
    }

    /// Connects the panel to a simulator link.
    pub fn attach(&mut self, link: Arc<dyn SimulatorLink>) {
        self.link = Some(link);
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Returns the control for `pin`.
    pub fn control(&self, pin: PinIndex) -> &PinControl {
        &self.controls[pin.get() as usize]
    }

    /// Iterates over all controls in pin order.
    pub fn controls(&self) -> impl Iterator<Item = (PinIndex, &PinControl)> {
        PinIndex::all().zip(self.controls.iter())
    }

    /// Requests a sync over the attached link and applies it.
    ///
    /// Returns the number of controls updated.  Without a link this is a
    /// no-op that returns `0`.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::Link`] if the sync fails; the controls are left
    /// untouched.
    pub async fn sync(&mut self) -> Result<usize, PanelError> {
        let Some(link) = self.link.as_ref() else {
            debug!("sync requested with no simulator attached");
            return Ok(0);
        };

        let snapshot = link.request_pin_sync().await?;
        info!("pin sync reported {} pins", snapshot.len());
        Ok(self.apply_snapshot(&snapshot))
    }

    /// Enables and sets every control reported in `snapshot`.
    ///
    /// Controls missing from the snapshot keep their current state.  Indices
    /// without a control are ignored.  Returns the number of controls
    /// updated.
    pub fn apply_snapshot(&mut self, snapshot: &PinSnapshot) -> usize {
        let mut applied = 0;
        for (index, asserted) in snapshot.iter() {
            match PinIndex::new(index as usize) {
                Some(pin) => {
                    let control = &mut self.controls[pin.get() as usize];
                    control.enabled = true;
                    control.asserted = asserted;
                    applied += 1;
                }
                None => warn!(index, "simulator reported a pin index with no control"),
            }
        }
        applied
    }

    /// Sets `pin` to `asserted` and forwards the change to the simulator.
    ///
    /// Without a link only the local control changes.
    ///
    /// # Errors
    ///
    /// - [`PanelError::PinDisabled`] if the simulator has not reported `pin`.
    /// - [`PanelError::Link`] if the update could not be sent; the control
    ///   keeps its previous state.
    pub async fn set(&mut self, pin: PinIndex, asserted: bool) -> Result<(), PanelError> {
        if !self.control(pin).enabled {
            return Err(PanelError::PinDisabled(pin));
        }

        if let Some(link) = self.link.as_ref() {
            link.send_pin_state_change(pin.pin_number(), asserted).await?;
        }

        self.controls[pin.get() as usize].asserted = asserted;
        debug!("{pin} set to {asserted}");
        Ok(())
    }

    /// Flips `pin` and forwards the change.  Returns the new state.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set`].
    pub async fn toggle(&mut self, pin: PinIndex) -> Result<bool, PanelError> {
        let asserted = !self.control(pin).asserted;
        self.set(pin, asserted).await?;
        Ok(asserted)
    }

    /// Renders the controls as a text grid.
    ///
    /// Each cell shows `[x]` for asserted, `[ ]` for deasserted and ` - ` for
    /// a disabled control, followed by the pin number.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in self.controls.chunks(COLUMNS) {
            let cells: Vec<String> = row
                .iter()
                .map(|control| {
                    let mark = match (control.enabled, control.asserted) {
                        (false, _) => " - ",
                        (true, true) => "[x]",
                        (true, false) => "[ ]",
                    };
                    let number = control.label.trim_start_matches("Pin ");
                    format!("{mark}{number:>3}")
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(" "));
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
