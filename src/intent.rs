//! Command intent flags shared between the reception context and the
//! control loop.
//!
//! ```text
//! ┌────────────────────┐ raise() ┌──────────┐ clear() ┌─────────────┐
//! │ CommandInterpreter │────────▶│ AtomicU8 │◀────────│ ControlLoop │
//! │ (callback context) │         │ bitfield │         │ (consumer)  │
//! └────────────────────┘         └──────────┘         └─────────────┘
//! ```
//!
//! Ownership is split per operation, not per field: the producer only ever
//! sets bits and the consumer only ever clears them. Each bit holds at most
//! one unconsumed intent per command kind; raising an already-pending bit
//! is a no-op.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::drivers::motor::TurnDirection;

/// A single deferred command signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Intent {
    TurnLeft = 0b0000_0001,
    TurnRight = 0b0000_0010,
    /// A Stop was applied directly by the interpreter.
    Stop = 0b0000_0100,
    /// A Start was applied directly by the interpreter.
    Start = 0b0000_1000,
    /// A direction toggle was applied directly by the interpreter.
    Reverse = 0b0001_0000,
}

impl Intent {
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

/// Copy of the bitfield at one instant, for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentSet(u8);

impl IntentSet {
    pub fn contains(self, intent: Intent) -> bool {
        self.0 & intent.mask() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// The shared pending-intent bitfield.
pub struct CommandIntent {
    bits: AtomicU8,
}

impl Default for CommandIntent {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandIntent {
    /// All flags clear.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Producer side: mark an intent pending.
    pub fn raise(&self, intent: Intent) {
        self.bits.fetch_or(intent.mask(), Ordering::Release);
    }

    /// Consumer side: acknowledge an intent.
    pub fn clear(&self, intent: Intent) {
        self.bits.fetch_and(!intent.mask(), Ordering::AcqRel);
    }

    pub fn is_pending(&self, intent: Intent) -> bool {
        self.snapshot().contains(intent)
    }

    pub fn any_pending(&self) -> bool {
        !self.snapshot().is_empty()
    }

    pub fn snapshot(&self) -> IntentSet {
        IntentSet(self.bits.load(Ordering::Acquire))
    }

    /// The turn to act on this iteration. Left wins when both are pending;
    /// the right intent stays set for a later iteration.
    pub fn next_turn(&self) -> Option<TurnDirection> {
        let set = self.snapshot();
        if set.contains(Intent::TurnLeft) {
            Some(TurnDirection::Left)
        } else if set.contains(Intent::TurnRight) {
            Some(TurnDirection::Right)
        } else {
            None
        }
    }
}

impl From<TurnDirection> for Intent {
    fn from(dir: TurnDirection) -> Self {
        match dir {
            TurnDirection::Left => Intent::TurnLeft,
            TurnDirection::Right => Intent::TurnRight,
        }
    }
}
