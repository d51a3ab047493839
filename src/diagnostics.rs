//! Hardware fault history.
//!
//! Keeps the most recent PWM faults in a fixed-capacity ring so the
//! telemetry path can report them without heap allocation. Oldest entries
//! are evicted first; the lifetime total keeps counting.

use heapless::Deque;

use crate::app::ports::PwmChannel;

const FAULT_SLOTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord {
    /// Control-loop uptime when the fault was observed.
    pub uptime_ms: u64,
    pub channel: PwmChannel,
    /// Write attempts made before giving up.
    pub attempts: u32,
}

#[derive(Default)]
pub struct FaultLog {
    entries: Deque<FaultRecord, FAULT_SLOTS>,
    total: u32,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: FaultRecord) {
        if self.entries.is_full() {
            self.entries.pop_front();
        }
        // Cannot fail: a slot was freed above if needed.
        let _ = self.entries.push_back(record);
        self.total = self.total.saturating_add(1);
    }

    /// Most recent fault, if any.
    pub fn last(&self) -> Option<&FaultRecord> {
        self.entries.back()
    }

    /// Retained entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &FaultRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Faults observed since boot, including evicted ones.
    pub fn total(&self) -> u32 {
        self.total
    }
}
