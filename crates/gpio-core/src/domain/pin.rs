//! Pin addressing and pin-state snapshots.
//!
//! # Index vs. pin number
//!
//! The simulator exposes [`PIN_COUNT`] pins.  Inside the application a pin is
//! addressed by its zero-based [`PinIndex`] (`0..=25`).  Humans and inbound
//! `PinUpdate` records use the one-based *pin number* (`1..=26`), which is
//! also the label shown next to each control (`"Pin 1"` … `"Pin 26"`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of addressable pins on the simulator.
pub const PIN_COUNT: usize = 26;

/// Zero-based index of one of the [`PIN_COUNT`] simulator pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinIndex(u8);

impl PinIndex {
    /// Returns `Some` if `index` addresses one of the [`PIN_COUNT`] pins.
    pub fn new(index: usize) -> Option<Self> {
        if index < PIN_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Converts a one-based pin number (as shown to users) to an index.
    pub fn from_pin_number(number: usize) -> Option<Self> {
        number.checked_sub(1).and_then(Self::new)
    }

    /// Zero-based value of this index.
    pub fn get(self) -> u8 {
        self.0
    }

    /// One-based pin number, as used in labels and inbound records.
    pub fn pin_number(self) -> u8 {
        self.0 + 1
    }

    /// Iterates over every valid index in ascending order.
    pub fn all() -> impl Iterator<Item = PinIndex> {
        (0..PIN_COUNT as u8).map(PinIndex)
    }
}

impl fmt::Display for PinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin {}", self.pin_number())
    }
}

/// Pin states reported by a single sync response.
///
/// Keys are zero-based indices as decoded from the wire (`pin_number - 1`).
/// The decoder does not clamp them to [`PIN_COUNT`], so a misbehaving
/// simulator can report indices with no matching pin; consumers decide what
/// to do with those.
///
/// A snapshot is never merged with an earlier one.  A pin that is missing
/// from the map was simply not reported this round, which is different from
/// being reported as deasserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinSnapshot(BTreeMap<u8, bool>);

impl PinSnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the state of the pin at `index`, replacing any earlier entry.
    pub fn insert(&mut self, index: u8, asserted: bool) {
        self.0.insert(index, asserted);
    }

    /// Returns the reported state at `index`, or `None` if it was not reported.
    pub fn get(&self, index: u8) -> Option<bool> {
        self.0.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(index, asserted)` pairs in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        self.0.iter().map(|(&index, &asserted)| (index, asserted))
    }

    /// Iterates over entries whose index addresses a real pin.
    pub fn known_pins(&self) -> impl Iterator<Item = (PinIndex, bool)> + '_ {
        self.iter()
            .filter_map(|(index, asserted)| PinIndex::new(index as usize).map(|p| (p, asserted)))
    }
}

impl FromIterator<(u8, bool)> for PinSnapshot {
    fn from_iter<I: IntoIterator<Item = (u8, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
