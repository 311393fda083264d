//! Simulator protocol commands.
//!
//! Every command starts with a one-byte opcode.  Only two exist:
//!
//! | Opcode | Name          | Payload                         |
//! |--------|---------------|---------------------------------|
//! | `0x10` | `RequestSync` | none                            |
//! | `0x35` | `PinUpdate`   | `[pin_number: u8, state: u8]`   |

/// Encoded size of a `PinUpdate` record, opcode included.
pub const PIN_UPDATE_LEN: usize = 3;

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// Opcode byte that opens every command on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Client asks the simulator to report every pin it knows about.
    RequestSync = 0x10,
    /// Report or command the state of a single pin (both directions).
    PinUpdate = 0x35,
}

impl Opcode {
    /// Number of payload bytes that follow this opcode.
    pub const fn payload_len(self) -> usize {
        match self {
            Opcode::RequestSync => 0,
            Opcode::PinUpdate => 2,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(Opcode::RequestSync),
            0x35 => Ok(Opcode::PinUpdate),
            _ => Err(()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// A fully decoded protocol command.
///
/// `PinUpdate` carries the raw bytes exactly as they travel on the wire.
/// Whether `pin` is a zero-based index or a one-based pin number depends on
/// the direction; see [`crate::protocol::codec`] for the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestSync,
    PinUpdate { pin: u8, state: u8 },
}

impl Command {
    /// Builds a `PinUpdate` from a boolean state (`true` → `1`, `false` → `0`).
    pub fn pin_update(pin: u8, asserted: bool) -> Self {
        Command::PinUpdate {
            pin,
            state: u8::from(asserted),
        }
    }

    /// Returns the opcode that introduces this command.
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::RequestSync => Opcode::RequestSync,
            Command::PinUpdate { .. } => Opcode::PinUpdate,
        }
    }

    /// Length of the encoded command in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode().payload_len()
    }
}
