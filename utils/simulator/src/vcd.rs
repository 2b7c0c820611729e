//! Value Change Dump output for the peripheral.
//!
//! The probe set is fixed: the raw pins, their synchronized levels, the edge
//! pulse, the deserializer state, the handshake flags and the five output
//! registers. The header and initial values are written with the first
//! sample; after that only changed probes are emitted under each timestamp.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::register_file::Register;
use crate::{Peripheral, PinLevels, SimError};

struct Probe {
    name: &'static str,
    width: usize,
}

const fn probe(name: &'static str, width: usize) -> Probe {
    Probe { name, width }
}

const PROBES: [Probe; 17] = [
    probe("reset_n", 1),
    probe("select_n", 1),
    probe("serial_clock", 1),
    probe("serial_data", 1),
    probe("select_sync", 1),
    probe("clock_sync", 1),
    probe("data_sync", 1),
    probe("clock_rising", 1),
    probe("bit_count", 5),
    probe("message", 16),
    probe("received", 1),
    probe("processed", 1),
    probe("output_enable_low", 8),
    probe("output_enable_high", 8),
    probe("pwm_enable_low", 8),
    probe("pwm_enable_high", 8),
    probe("pwm_duty_cycle", 8),
];

const FIRST_REGISTER: usize = 12;

/// One tick of the 10 MHz system clock.
const TIMESCALE: &str = "100ns";
const MODULE_NAME: &str = "spi_periph";

pub type Sample = [u64; PROBES.len()];

/// Snapshot of every probe for the tick that just committed.
pub fn sample(pins: PinLevels, reset_n: bool, periph: &Peripheral) -> Sample {
    let synced = periph.synced();
    let regs = periph.registers();
    let scalars = [
        reset_n,
        pins.select,
        pins.serial_clock,
        pins.serial_data,
        synced.select,
        synced.serial_clock,
        synced.serial_data,
        periph.pending_edge(),
    ];

    let mut values = [0u64; PROBES.len()];
    for (slot, bit) in values.iter_mut().zip(scalars) {
        *slot = u64::from(bit);
    }
    values[8] = u64::from(periph.bit_count());
    values[9] = u64::from(periph.message());
    values[10] = u64::from(periph.received());
    values[11] = u64::from(periph.processed());
    for (offset, reg) in Register::ALL.into_iter().enumerate() {
        values[FIRST_REGISTER + offset] = u64::from(regs.get(reg));
    }
    values
}

/// Streaming VCD writer.
pub struct VcdWriter<W: Write = BufWriter<File>> {
    out: W,
    prev: Option<Sample>,
}

impl VcdWriter {
    pub fn create(path: &Path) -> Result<Self, SimError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::with_capacity(1 << 20, file)))
    }
}

impl<W: Write> VcdWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, prev: None }
    }

    pub fn dump(&mut self, time: u64, values: &Sample) -> Result<(), SimError> {
        let mut text = String::new();
        match &self.prev {
            None => self.write_header(&mut text, values),
            Some(prev) => {
                let mut stamped = false;
                for (idx, (&old, &new)) in prev.iter().zip(values).enumerate() {
                    if old == new {
                        continue;
                    }
                    if !stamped {
                        let _ = writeln!(text, "#{time}");
                        stamped = true;
                    }
                    push_value(&mut text, idx, new);
                }
            }
        }
        self.prev = Some(*values);
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W, SimError> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_header(&self, text: &mut String, values: &Sample) {
        let _ = writeln!(text, "$timescale {TIMESCALE} $end");
        let _ = writeln!(text, "$scope module {MODULE_NAME} $end");
        for (idx, probe) in PROBES.iter().enumerate() {
            let _ = writeln!(
                text,
                "$var wire {} {} {} $end",
                probe.width,
                vcd_id(idx),
                probe.name
            );
        }
        text.push_str("$upscope $end\n$enddefinitions $end\n#0\n$dumpvars\n");
        for (idx, &value) in values.iter().enumerate() {
            push_value(text, idx, value);
        }
        text.push_str("$end\n");
    }
}

fn vcd_id(idx: usize) -> char {
    char::from(b'a' + idx as u8)
}

fn push_value(text: &mut String, idx: usize, value: u64) {
    let width = PROBES[idx].width;
    if width == 1 {
        let _ = writeln!(text, "{}{}", value & 1, vcd_id(idx));
    } else {
        let _ = writeln!(text, "b{value:0width$b} {}", vcd_id(idx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TickInputs;

    fn render(samples: &[Sample]) -> String {
        let mut writer = VcdWriter::new(Vec::new());
        for (time, values) in samples.iter().enumerate() {
            writer.dump(time as u64, values).unwrap();
        }
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn header_declares_every_probe() {
        let periph = Peripheral::default();
        let text = render(&[sample(PinLevels::idle(), true, &periph)]);
        assert!(text.starts_with("$timescale 100ns $end\n$scope module spi_periph $end\n"));
        assert_eq!(text.matches("$var wire").count(), PROBES.len());
        assert!(text.contains("$var wire 16 j message $end"));
        assert!(text.contains("$var wire 8 q pwm_duty_cycle $end"));
        assert!(text.contains("b0000000000000000 j\n"));
    }

    #[test]
    fn only_changes_are_emitted() {
        let mut periph = Peripheral::default();
        let idle = sample(PinLevels::idle(), true, &periph);
        let pins = PinLevels {
            select: false,
            ..PinLevels::idle()
        };
        periph.advance(TickInputs::run(pins));
        let selected = sample(pins, true, &periph);

        let text = render(&[idle, idle, selected]);
        let body = text.rsplit("$end\n").next().unwrap();
        assert_eq!(body, "#2\n0b\n");
    }

    #[test]
    fn multi_bit_values_are_zero_padded() {
        let mut text = String::new();
        push_value(&mut text, 8, 5);
        assert_eq!(text, "b00101 i\n");
    }
}
