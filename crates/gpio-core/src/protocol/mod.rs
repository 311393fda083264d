//! Protocol module containing the command set and the byte codec.

pub mod codec;
pub mod command;

pub use codec::{decode_command, decode_sync_burst, encode_command, ProtocolError};
pub use command::{Command, Opcode, PIN_UPDATE_LEN};
