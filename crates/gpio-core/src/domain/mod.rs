//! Domain types for the GPIO simulator client.
//!
//! Pure values with no I/O: pin addressing and the snapshot produced by a
//! sync request.

pub mod pin;

pub use pin::{PinIndex, PinSnapshot, PIN_COUNT};
