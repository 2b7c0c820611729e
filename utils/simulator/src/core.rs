use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::decoder::{Command, Decoded};
use crate::deserializer::{CounterPolicy, FRAME_BITS, Release};
use crate::host::{SpiHost, Waveform};
use crate::register_file::RegisterFile;
use crate::vcd::{self, VcdWriter};
use crate::{Config, Peripheral, PinLevels, SimError, TickInputs, TickOutputs};

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub clock_edges: u64,
    pub bits_shifted: u64,
    pub frames: u64,
    pub short_frames: u64,
    pub decodes: u64,
    pub dropped: u64,
}

/// Drives a [`Peripheral`] tick by tick from a host bus model, optionally
/// recording a VCD trace.
pub struct Simulator {
    config: Config,
    peripheral: Peripheral,
    host: SpiHost,
    reset_n: bool,
    timestamp: u64,
    vcd: Option<VcdWriter>,
    stats: RunStats,
}

impl Simulator {
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Simulator {
            peripheral: Peripheral::new(config.peripheral.counter_policy),
            host: SpiHost::new(config.bus),
            config,
            reset_n: true,
            timestamp: 0,
            vcd: None,
            stats: RunStats::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    pub fn registers(&self) -> RegisterFile {
        self.peripheral.registers()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn open_vcd(&mut self, path: &Path) -> Result<(), SimError> {
        self.close_vcd()?;
        self.vcd = Some(VcdWriter::create(path)?);
        debug!(path = %path.display(), "VCD trace opened");
        Ok(())
    }

    pub fn close_vcd(&mut self) -> Result<(), SimError> {
        if let Some(vcd) = self.vcd.take() {
            vcd.finish()?;
        }
        Ok(())
    }

    /// Drive the active-low reset pin; it stays at this level until changed.
    pub fn set_reset(&mut self, asserted: bool) {
        self.reset_n = !asserted;
    }

    /// Hold reset with an idle bus, then release it and let the pipeline settle.
    pub fn reset(&mut self) -> Result<(), SimError> {
        debug!(cycles = self.config.reset_cycles, "asserting reset");
        self.set_reset(true);
        self.idle(self.config.reset_cycles)?;
        self.set_reset(false);
        self.idle(self.config.post_reset_cycles)
    }

    pub fn tick(&mut self, pins: PinLevels) -> Result<TickOutputs, SimError> {
        let out = self.peripheral.advance(TickInputs {
            pins,
            reset_n: self.reset_n,
        });
        self.record(&out);

        if let Some(vcd) = self.vcd.as_mut() {
            let values = vcd::sample(pins, self.reset_n, &self.peripheral);
            vcd.dump(self.timestamp, &values)?;
        }
        self.timestamp += 1;
        Ok(out)
    }

    pub fn idle(&mut self, cycles: u32) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.tick(PinLevels::idle())?;
        }
        Ok(())
    }

    pub fn drive(&mut self, waveform: Waveform) -> Result<(), SimError> {
        for pins in waveform {
            self.tick(pins)?;
        }
        Ok(())
    }

    /// True when the bit counter is full and only a reset will clear it, so
    /// the next transaction shifts nothing and replays the stored message.
    pub fn counter_held(&self) -> bool {
        self.config.peripheral.counter_policy == CounterPolicy::HoldUntilReset
            && self.peripheral.bit_count() == FRAME_BITS
    }

    pub fn send(&mut self, command: Command) -> Result<(), SimError> {
        info!(%command, "sending command");
        self.warn_if_held();
        self.drive(self.host.frame(command))
    }

    /// Clock the low `bits` bits of `word` inside one select window.
    pub fn send_bits(&mut self, word: u16, bits: u8) -> Result<(), SimError> {
        info!(word = %format!("{word:#06x}"), bits, "sending partial frame");
        self.warn_if_held();
        let waveform = self.host.partial_frame(word, bits)?;
        self.drive(waveform)
    }

    /// Like [`Simulator::send_bits`] but select stays asserted afterwards.
    pub fn send_bits_held(&mut self, word: u16, bits: u8) -> Result<(), SimError> {
        info!(word = %format!("{word:#06x}"), bits, "sending bits, select held");
        self.warn_if_held();
        let waveform = self.host.held_frame(word, bits)?;
        self.drive(waveform)
    }

    fn warn_if_held(&self) {
        if self.counter_held() {
            warn!(
                stored = %format!("{:#06x}", self.peripheral.message()),
                "bit counter is only cleared by reset; this transaction replays the stored message"
            );
        }
    }

    fn record(&mut self, out: &TickOutputs) {
        let tick = self.timestamp;
        self.stats.ticks += 1;
        self.stats.clock_edges += u64::from(out.clock_rising);

        if let Some(bit) = out.shifted {
            self.stats.bits_shifted += 1;
            trace!(tick, bit, count = self.peripheral.bit_count(), "shifted bit");
        }

        match out.released {
            Some(Release::Complete) => {
                self.stats.frames += 1;
                debug!(
                    tick,
                    message = %format!("{:#06x}", self.peripheral.message()),
                    "frame received"
                );
            }
            Some(Release::Short { bits }) => {
                self.stats.short_frames += 1;
                debug!(tick, bits, "select released before a full frame");
            }
            None => {}
        }

        if out.dropped {
            self.stats.dropped += 1;
            debug!(tick, "frame announced while the previous one was in flight");
        }

        if let Some(decoded) = out.decoded {
            self.stats.decodes += 1;
            match decoded {
                Decoded::Write { register, data } => {
                    debug!(tick, %register, data = %format!("{data:#04x}"), "register written");
                }
                Decoded::NotWrite { address } => {
                    debug!(tick, address, "write flag clear, command ignored");
                }
                Decoded::Unmapped { address } => {
                    debug!(tick, address, "write to unmapped address ignored");
                }
            }
        }
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        let _ = self.close_vcd();
    }
}
