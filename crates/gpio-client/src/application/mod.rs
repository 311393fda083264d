//! Application layer use cases for the client application.
//!
//! - **`pin_panel`** – The 26 pin controls the user sees.  Syncs them from
//!   the simulator once after connecting and forwards each local toggle.  It
//!   talks to the simulator only through the [`pin_panel::SimulatorLink`]
//!   trait, which the infrastructure layer implements.
//!
//! - **`panel_command`** – Parses the line commands typed into the
//!   interactive panel (`toggle 3`, `on 12`, `sync`, …).

pub mod panel_command;
pub mod pin_panel;
