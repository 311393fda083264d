//! # gpio-core
//!
//! Shared library for the GPIO simulator client containing the wire protocol
//! codec and the pin domain types.
//!
//! This crate has zero dependencies on sockets, async runtimes, or UI code.
//! Everything here operates on byte slices and plain values, so it can be
//! tested exhaustively without a simulator process.
//!
//! # Architecture overview
//!
//! The simulator exposes 26 boolean "pins".  A control application connects
//! over TCP, asks for the current state of every known pin, and pushes its own
//! changes back.  The protocol is deliberately tiny:
//!
//! - **`protocol`** – Single-byte opcodes and their fixed-size payloads.  There
//!   is no header, no length prefix and no terminator; a sync reply is just a
//!   run of `PinUpdate` records that ends when the socket goes quiet.
//!
//! - **`domain`** – Pin indices and the [`PinSnapshot`] produced by each sync.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `gpio_core::PinSnapshot` instead of `gpio_core::domain::pin::PinSnapshot`.
pub use domain::pin::{PinIndex, PinSnapshot, PIN_COUNT};
pub use protocol::codec::{decode_command, decode_sync_burst, encode_command, ProtocolError};
pub use protocol::command::{Command, Opcode};
