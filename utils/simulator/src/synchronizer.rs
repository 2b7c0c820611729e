use crate::PinLevels;

/// Number of flip-flops between a raw pin and the rest of the design.
pub const SYNC_STAGES: u32 = 2;

/// Two-flop synchronizer for one asynchronous input.
///
/// `stage1` samples the raw pin on every tick and `stage2` samples `stage1`.
/// Only `stage2` is exposed as a level; the edge detector is the one other
/// reader and compares both stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedSignal {
    stage1: bool,
    stage2: bool,
}

impl SyncedSignal {
    pub const fn new(reset_level: bool) -> Self {
        Self {
            stage1: reset_level,
            stage2: reset_level,
        }
    }

    /// State after sampling `raw` on one clock tick.
    pub const fn sample(self, raw: bool) -> Self {
        Self {
            stage1: raw,
            stage2: self.stage1,
        }
    }

    pub const fn level(&self) -> bool {
        self.stage2
    }

    pub(crate) const fn stage1(&self) -> bool {
        self.stage1
    }
}

/// Synchronizers for the three bus pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSynchronizer {
    select: SyncedSignal,
    clock: SyncedSignal,
    data: SyncedSignal,
}

impl InputSynchronizer {
    pub const fn new() -> Self {
        Self {
            // select is active low, so reset parks it deselected
            select: SyncedSignal::new(true),
            clock: SyncedSignal::new(false),
            data: SyncedSignal::new(false),
        }
    }

    pub const fn sample(self, pins: PinLevels) -> Self {
        Self {
            select: self.select.sample(pins.select),
            clock: self.clock.sample(pins.serial_clock),
            data: self.data.sample(pins.serial_data),
        }
    }

    /// Synchronized select reads asserted (logical 0).
    pub const fn selected(&self) -> bool {
        !self.select.level()
    }

    pub const fn data_bit(&self) -> bool {
        self.data.level()
    }

    pub const fn clock(&self) -> &SyncedSignal {
        &self.clock
    }

    /// Synchronized levels as `(select, serial_clock, serial_data)`.
    pub const fn levels(&self) -> PinLevels {
        PinLevels {
            select: self.select.level(),
            serial_clock: self.clock.level(),
            serial_data: self.data.level(),
        }
    }
}

impl Default for InputSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}
