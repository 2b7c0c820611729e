use crate::decoder::{self, Decoded};
use crate::deserializer::{CounterPolicy, Deserializer, FrameStep, Release};
use crate::edge;
use crate::handshake::Handshake;
use crate::register_file::RegisterFile;
use crate::synchronizer::InputSynchronizer;

/// Raw levels of the three bus pins for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLevels {
    /// Active low.
    pub select: bool,
    pub serial_clock: bool,
    pub serial_data: bool,
}

impl PinLevels {
    /// Deselected bus with clock and data low.
    pub const fn idle() -> Self {
        Self {
            select: true,
            serial_clock: false,
            serial_data: false,
        }
    }
}

impl Default for PinLevels {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInputs {
    pub pins: PinLevels,
    /// Active low.
    pub reset_n: bool,
}

impl TickInputs {
    pub const fn run(pins: PinLevels) -> Self {
        Self { pins, reset_n: true }
    }

    pub const fn reset() -> Self {
        Self {
            pins: PinLevels::idle(),
            reset_n: false,
        }
    }
}

/// Committed state after a tick plus the events that happened during it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutputs {
    pub registers: RegisterFile,
    pub clock_rising: bool,
    pub shifted: Option<bool>,
    pub released: Option<Release>,
    pub decoded: Option<Decoded>,
    pub dropped: bool,
    pub received: bool,
    pub processed: bool,
}

/// Cycle model of the SPI register interface.
///
/// Every tick computes the complete next state from the current one and then
/// commits it in one assignment, so no component ever sees a value written
/// during the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peripheral {
    policy: CounterPolicy,
    inputs: InputSynchronizer,
    frame: Deserializer,
    handshake: Handshake,
    registers: RegisterFile,
}

impl Peripheral {
    pub const fn new(policy: CounterPolicy) -> Self {
        Self {
            policy,
            inputs: InputSynchronizer::new(),
            frame: Deserializer::new(),
            handshake: Handshake::Idle,
            registers: RegisterFile::new(),
        }
    }

    pub fn advance(&mut self, inputs: TickInputs) -> TickOutputs {
        let (next, outputs) = self.next_state(inputs);
        *self = next;
        outputs
    }

    fn next_state(&self, inputs: TickInputs) -> (Self, TickOutputs) {
        if !inputs.reset_n {
            let next = Self::new(self.policy);
            return (next, next.quiet_outputs());
        }

        let clock_rising = edge::clock_rising(self.inputs.clock());
        let FrameStep {
            next: frame,
            shifted,
            released,
        } = self.frame.step(
            self.inputs.selected(),
            clock_rising,
            self.inputs.data_bit(),
            self.policy,
        );
        let handshake = self
            .handshake
            .step(released == Some(Release::Complete));

        let decoded = handshake
            .consume
            .then(|| decoder::decode(self.frame.message()));
        let registers = match decoded {
            Some(decoded) => self.registers.commit(decoded),
            None => self.registers,
        };

        let next = Self {
            policy: self.policy,
            inputs: self.inputs.sample(inputs.pins),
            frame,
            handshake: handshake.next,
            registers,
        };
        let outputs = TickOutputs {
            registers,
            clock_rising,
            shifted,
            released,
            decoded,
            dropped: handshake.dropped,
            received: handshake.next.received(),
            processed: handshake.next.processed(),
        };
        (next, outputs)
    }

    fn quiet_outputs(&self) -> TickOutputs {
        TickOutputs {
            registers: self.registers,
            clock_rising: false,
            shifted: None,
            released: None,
            decoded: None,
            dropped: false,
            received: self.received(),
            processed: self.processed(),
        }
    }

    pub const fn registers(&self) -> RegisterFile {
        self.registers
    }

    pub const fn message(&self) -> u16 {
        self.frame.message()
    }

    pub const fn bit_count(&self) -> u8 {
        self.frame.bit_count()
    }

    pub const fn handshake(&self) -> Handshake {
        self.handshake
    }

    pub const fn received(&self) -> bool {
        self.handshake.received()
    }

    pub const fn processed(&self) -> bool {
        self.handshake.processed()
    }

    /// Synchronized pin levels as seen by the decode path.
    pub const fn synced(&self) -> PinLevels {
        self.inputs.levels()
    }

    /// Edge pulse the next tick will act on.
    pub const fn pending_edge(&self) -> bool {
        edge::clock_rising(self.inputs.clock())
    }
}

impl Default for Peripheral {
    fn default() -> Self {
        Self::new(CounterPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register_file::Register;

    const HALF: usize = 3;

    fn select(serial_clock: bool, serial_data: bool) -> PinLevels {
        PinLevels {
            select: false,
            serial_clock,
            serial_data,
        }
    }

    /// Per-tick pin levels for `bits` bits of `word`, MSB first.
    fn frame_levels(word: u16, bits: u8) -> Vec<PinLevels> {
        let mut levels = vec![select(false, false)];
        for i in (0..bits).rev() {
            let bit = (word >> i) & 1 == 1;
            levels.extend(std::iter::repeat_n(select(false, bit), HALF));
            levels.extend(std::iter::repeat_n(select(true, bit), HALF));
        }
        levels.extend(std::iter::repeat_n(PinLevels::idle(), 8));
        levels
    }

    fn run(periph: &mut Peripheral, levels: &[PinLevels]) -> Vec<TickOutputs> {
        levels
            .iter()
            .map(|&pins| periph.advance(TickInputs::run(pins)))
            .collect()
    }

    fn fresh() -> Peripheral {
        let mut periph = Peripheral::default();
        for _ in 0..3 {
            periph.advance(TickInputs::reset());
        }
        periph
    }

    #[test]
    fn synchronized_select_lags_two_ticks() {
        let mut periph = fresh();
        periph.advance(TickInputs::run(select(false, false)));
        assert!(periph.synced().select);
        periph.advance(TickInputs::run(select(false, false)));
        assert!(!periph.synced().select);
    }

    #[test]
    fn deserializes_msb_first() {
        let mut periph = fresh();
        let word = 0b1011_0010_1110_0001;
        let levels = frame_levels(word, 16);
        let outputs = run(&mut periph, &levels);
        let bits: Vec<bool> = outputs.iter().filter_map(|out| out.shifted).collect();
        let expected: Vec<bool> = (0..16).rev().map(|i| (word >> i) & 1 == 1).collect();
        assert_eq!(bits, expected);
        assert_eq!(periph.message(), word);
        assert_eq!(periph.bit_count(), 16);
    }

    #[test]
    fn one_edge_per_bit() {
        let mut periph = fresh();
        let outputs = run(&mut periph, &frame_levels(0xFFFF, 16));
        assert_eq!(outputs.iter().filter(|out| out.clock_rising).count(), 16);
    }

    #[test]
    fn exactly_once_decode() {
        let mut periph = fresh();
        let outputs = run(&mut periph, &frame_levels(0x8005, 16));

        let decodes: Vec<usize> = outputs
            .iter()
            .enumerate()
            .filter(|(_, out)| out.decoded.is_some())
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(decodes.len(), 1);

        let processed: Vec<usize> = outputs
            .iter()
            .enumerate()
            .filter(|(_, out)| out.processed)
            .map(|(tick, _)| tick)
            .collect();
        assert_eq!(processed, decodes);

        let rise = processed[0];
        assert!(outputs[rise - 1].received);
        assert!(!outputs[rise - 1].processed);
        assert!(outputs[rise].received);
        assert!(!outputs[rise + 1].received);
        assert!(!outputs[rise + 1].processed);

        assert_eq!(periph.registers().output_enable_low(), 0x05);
        assert_eq!(
            periph.registers(),
            RegisterFile::new().with(Register::OutputEnableLow, 0x05)
        );
    }

    #[test]
    fn registers_settle_after_pulse() {
        let mut periph = fresh();
        let outputs = run(&mut periph, &frame_levels(0x847F, 16));
        let decode_tick = outputs
            .iter()
            .position(|out| out.decoded.is_some())
            .unwrap();
        assert_eq!(outputs[decode_tick - 1].registers.pwm_duty_cycle(), 0);
        assert_eq!(outputs[decode_tick].registers.pwm_duty_cycle(), 0x7F);
    }

    #[test]
    fn unmapped_write_changes_nothing() {
        let mut periph = fresh();
        let outputs = run(&mut periph, &frame_levels(0xFFAA, 16));
        assert_eq!(outputs.iter().filter(|out| out.decoded.is_some()).count(), 1);
        assert_eq!(periph.registers(), RegisterFile::new());
    }

    #[test]
    fn short_frame_is_not_announced() {
        let mut periph = fresh();
        let outputs = run(&mut periph, &frame_levels(0x84, 8));
        assert!(outputs.iter().all(|out| !out.received));
        assert!(
            outputs
                .iter()
                .any(|out| out.released == Some(Release::Short { bits: 8 }))
        );
        assert_eq!(periph.bit_count(), 8);
    }

    #[test]
    fn reset_mid_frame_clears_everything() {
        let mut periph = fresh();
        run(&mut periph, &frame_levels(0x847F, 16));
        let levels = frame_levels(0x8312, 16);
        run(&mut periph, &levels[..levels.len() / 2]);

        let out = periph.advance(TickInputs::reset());
        assert_eq!(periph.message(), 0);
        assert_eq!(periph.bit_count(), 0);
        assert!(!periph.received());
        assert!(!periph.processed());
        assert_eq!(periph.registers(), RegisterFile::new());
        assert_eq!(out.registers, RegisterFile::new());
        assert!(periph.synced().select);
    }

    #[test]
    fn reset_during_handshake_cancels_decode() {
        let mut periph = fresh();
        let levels = frame_levels(0x847F, 16);
        for &pins in &levels {
            let out = periph.advance(TickInputs::run(pins));
            if out.received {
                break;
            }
        }
        assert_eq!(periph.handshake(), Handshake::Available);
        periph.advance(TickInputs::reset());
        let outputs = run(&mut periph, &[PinLevels::idle(); 4]);
        assert!(outputs.iter().all(|out| out.decoded.is_none()));
        assert_eq!(periph.registers(), RegisterFile::new());
    }

    #[test]
    fn held_counter_replays_first_message() {
        let mut periph = fresh();
        run(&mut periph, &frame_levels(0x8005, 16));
        let outputs = run(&mut periph, &frame_levels(0x81CC, 16));
        assert!(outputs.iter().all(|out| out.shifted.is_none()));
        assert_eq!(
            outputs.iter().filter_map(|out| out.decoded).collect::<Vec<_>>(),
            [Decoded::Write {
                register: Register::OutputEnableLow,
                data: 0x05
            }]
        );
        assert_eq!(periph.registers().output_enable_high(), 0);
    }

    #[test]
    fn rearm_policy_accepts_back_to_back_frames() {
        let mut periph = Peripheral::new(CounterPolicy::RearmOnSelect);
        periph.advance(TickInputs::reset());
        run(&mut periph, &frame_levels(0x8005, 16));
        run(&mut periph, &frame_levels(0x81CC, 16));
        assert_eq!(periph.registers().output_enable_low(), 0x05);
        assert_eq!(periph.registers().output_enable_high(), 0xCC);
    }
}
