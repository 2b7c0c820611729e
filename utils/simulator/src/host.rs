use serde::{Deserialize, Serialize};

use crate::decoder::Command;
use crate::deserializer::FRAME_BITS;
use crate::synchronizer::SYNC_STAGES;
use crate::{PinLevels, SimError};

/// Idle ticks needed between transactions: the select release has to cross
/// the synchronizer and the handshake needs two more ticks to return to idle.
pub const MIN_SETTLE_CYCLES: u32 = SYNC_STAGES + 2;

/// Host-side pacing of one transaction, in system clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusTiming {
    /// Ticks SCLK spends at each level.
    pub half_period: u32,
    /// Ticks select is held asserted before the first bit.
    pub setup_cycles: u32,
    /// Idle ticks after select is released.
    pub settle_cycles: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            half_period: 50,
            setup_cycles: 1,
            settle_cycles: 600,
        }
    }
}

impl BusTiming {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.half_period == 0 {
            return Err(SimError::InvalidConfig(
                "bus.half_period must be at least one tick".into(),
            ));
        }
        if self.settle_cycles < MIN_SETTLE_CYCLES {
            return Err(SimError::InvalidConfig(format!(
                "bus.settle_cycles must be at least {MIN_SETTLE_CYCLES}, got {}",
                self.settle_cycles
            )));
        }
        Ok(())
    }

    /// Ticks taken by a transaction of `bits` bits.
    pub fn frame_ticks(&self, bits: u8) -> usize {
        self.setup_cycles as usize
            + usize::from(bits) * 2 * self.half_period as usize
            + self.settle_cycles as usize
    }
}

/// Pin levels to drive, one entry per tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Waveform {
    levels: Vec<PinLevels>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PinLevels> + '_ {
        self.levels.iter().copied()
    }

    fn hold(&mut self, pins: PinLevels, ticks: u32) {
        self.levels
            .extend(std::iter::repeat_n(pins, ticks as usize));
    }
}

impl IntoIterator for Waveform {
    type Item = PinLevels;
    type IntoIter = std::vec::IntoIter<PinLevels>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.into_iter()
    }
}

/// Bus controller that bit-bangs commands onto the three pins.
///
/// Data changes while SCLK is low and is held through the high phase; select
/// goes back high with SCLK low once the last bit has been clocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpiHost {
    timing: BusTiming,
}

impl SpiHost {
    pub const fn new(timing: BusTiming) -> Self {
        Self { timing }
    }

    pub const fn timing(&self) -> &BusTiming {
        &self.timing
    }

    pub fn frame(&self, command: Command) -> Waveform {
        self.waveform(command.to_word(), FRAME_BITS, true)
    }

    /// The low `bits` bits of `word`, MSB first, inside one select window.
    pub fn partial_frame(&self, word: u16, bits: u8) -> Result<Waveform, SimError> {
        if bits > FRAME_BITS {
            return Err(SimError::FrameTooLong(bits));
        }
        Ok(self.waveform(word, bits, true))
    }

    /// Clocks `bits` bits and stops with select still asserted and SCLK low.
    pub fn held_frame(&self, word: u16, bits: u8) -> Result<Waveform, SimError> {
        if bits > FRAME_BITS {
            return Err(SimError::FrameTooLong(bits));
        }
        Ok(self.waveform(word, bits, false))
    }

    fn waveform(&self, word: u16, bits: u8, release: bool) -> Waveform {
        let mut wave = Waveform {
            levels: Vec::with_capacity(self.timing.frame_ticks(bits)),
        };
        let selected = |serial_clock, serial_data| PinLevels {
            select: false,
            serial_clock,
            serial_data,
        };

        wave.hold(selected(false, false), self.timing.setup_cycles);
        for i in (0..bits).rev() {
            let bit = (word >> i) & 1 == 1;
            wave.hold(selected(false, bit), self.timing.half_period);
            wave.hold(selected(true, bit), self.timing.half_period);
        }
        if release {
            wave.hold(PinLevels::idle(), self.timing.settle_cycles);
        } else {
            wave.hold(selected(false, false), 1);
        }
        wave
    }
}
