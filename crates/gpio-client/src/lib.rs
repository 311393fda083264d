//! gpio-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does gpio-client do?
//!
//! A GPIO simulator process listens on a TCP port and owns 26 boolean pins.
//! This client:
//!
//! 1. Opens one TCP connection to the simulator (`PinConnector::connect`).
//! 2. Sends a `RequestSync` and drains the reply burst into a `PinSnapshot`.
//! 3. Shows the reported pins on a `PinPanel`, enabling only those the
//!    simulator knows about.
//! 4. Forwards every local toggle to the simulator as a `PinUpdate`.

/// Application layer: the pin panel use case.
pub mod application;

/// Infrastructure layer: simulator connection and configuration storage.
pub mod infrastructure;
