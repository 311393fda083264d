//! Byte codec for the simulator protocol.
//!
//! Wire format:
//! ```text
//! RequestSync: [0x10]
//! PinUpdate:   [0x35][pin:1][state:1]
//! ```
//! There is no header, length prefix, terminator or checksum.
//!
//! # Pin numbering on the wire
//!
//! The two directions disagree about the `pin` byte:
//!
//! - **Outbound** (`encode_command`) writes the `pin` value exactly as given.
//!   Nothing is added or validated.
//! - **Inbound** (`decode_sync_burst`) treats the byte as a one-based pin
//!   number and subtracts one to get the snapshot index.
//!
//! Both behaviours are kept byte-for-byte so the client stays compatible with
//! existing simulators.

use thiserror::Error;
use tracing::trace;

use crate::domain::pin::PinSnapshot;
use crate::protocol::command::{Command, Opcode};

/// Errors that can occur while strictly decoding a single command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice ends before the command is complete.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first byte is not a recognized opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Command`] into its wire bytes.
///
/// # Examples
///
/// ```rust
/// use gpio_core::{encode_command, Command};
///
/// assert_eq!(encode_command(&Command::RequestSync), vec![0x10]);
/// assert_eq!(encode_command(&Command::pin_update(7, true)), vec![0x35, 7, 1]);
/// ```
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut buf = Vec::with_capacity(command.encoded_len());
    buf.push(command.opcode() as u8);
    if let Command::PinUpdate { pin, state } = *command {
        buf.push(pin);
        buf.push(state);
    }
    buf
}

/// Decodes one [`Command`] from the beginning of `bytes`.
///
/// Returns the command and the number of bytes consumed.  This is the strict
/// counterpart of [`decode_sync_burst`] and is used where a peer's bytes must
/// be interpreted exactly, such as in test simulators.
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownOpcode`] for an unrecognized first byte and
/// [`ProtocolError::InsufficientData`] if the payload is incomplete.
pub fn decode_command(bytes: &[u8]) -> Result<(Command, usize), ProtocolError> {
    let first = *bytes.first().ok_or(ProtocolError::InsufficientData {
        needed: 1,
        available: 0,
    })?;
    let opcode = Opcode::try_from(first).map_err(|_| ProtocolError::UnknownOpcode(first))?;

    let needed = 1 + opcode.payload_len();
    if bytes.len() < needed {
        return Err(ProtocolError::InsufficientData {
            needed,
            available: bytes.len(),
        });
    }

    let command = match opcode {
        Opcode::RequestSync => Command::RequestSync,
        Opcode::PinUpdate => Command::PinUpdate {
            pin: bytes[1],
            state: bytes[2],
        },
    };
    Ok((command, needed))
}

/// Decodes a sync reply chunk into a [`PinSnapshot`].
///
/// `chunk` is everything that was available on the socket before it went
/// quiet.  Decoding is lenient and never fails:
///
/// - `0x35` followed by at least two bytes consumes `[pin_number, state]`.
///   The record lands at index `pin_number - 1` with `state == 1` as its
///   value; any other state byte is `false`.  Pin number `0` is dropped.
/// - Any other byte is skipped and decoding resumes at the next byte.
/// - A trailing `0x35` whose payload did not arrive in this chunk is dropped.
///   Nothing is carried over to a later chunk.
///
/// Later records for the same pin overwrite earlier ones.
///
/// # Examples
///
/// ```rust
/// use gpio_core::decode_sync_burst;
///
/// let snapshot = decode_sync_burst(&[0x35, 1, 1, 0x35, 3, 0]);
/// assert_eq!(snapshot.get(0), Some(true));
/// assert_eq!(snapshot.get(2), Some(false));
/// assert_eq!(snapshot.len(), 2);
/// ```
pub fn decode_sync_burst(chunk: &[u8]) -> PinSnapshot {
    let mut snapshot = PinSnapshot::new();
    let mut pos = 0;

    while pos < chunk.len() {
        let byte = chunk[pos];
        pos += 1;

        if byte != Opcode::PinUpdate as u8 {
            trace!(byte, offset = pos - 1, "skipping unrecognized byte in sync reply");
            continue;
        }
        if chunk.len() - pos < Opcode::PinUpdate.payload_len() {
            trace!(offset = pos - 1, "dropping pin update with incomplete payload");
            continue;
        }

        let pin_number = chunk[pos];
        let state = chunk[pos + 1];
        pos += 2;

        match pin_number.checked_sub(1) {
            Some(index) => snapshot.insert(index, state == 1),
            None => trace!("dropping pin update for pin number 0"),
        }
    }

    snapshot
}

// ── Tests ─────────────────────────────────────────────────────────────────────
