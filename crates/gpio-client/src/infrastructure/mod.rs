//! Infrastructure layer for the client application.
//!
//! **Dependency rule**: this layer may depend on `application` and `gpio_core`,
//! but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – `PinConnector`, the TCP connection to the simulator.  It
//!   owns the socket, serializes every operation behind a mutex, and
//!   implements the application's `SimulatorLink` trait.
//!
//! - **`storage`** – TOML configuration file (simulator address, timeouts,
//!   log level).

pub mod network;
pub mod storage;
