use serde::{Deserialize, Serialize};

/// Bits in one command frame.
pub const FRAME_BITS: u8 = 16;

/// When the bit counter is cleared besides system reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CounterPolicy {
    /// Only reset clears the counter. After the first complete frame every
    /// later select cycle shifts nothing and re-announces the stored message.
    #[default]
    HoldUntilReset,
    /// The counter is also cleared on the tick select becomes asserted.
    RearmOnSelect,
}

/// What a select release meant for the frame in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// 16 bits were held when select went away: announce the message.
    Complete,
    /// Fewer bits arrived; nothing is announced and the counter keeps `bits`.
    Short { bits: u8 },
}

/// Result of evaluating the deserializer for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStep {
    pub next: Deserializer,
    pub shifted: Option<bool>,
    pub released: Option<Release>,
}

/// Bit-serial shift register with frame-boundary detection.
///
/// The message is accumulated MSB first. `selected` remembers the
/// synchronized select level of the previous tick so the asserted to
/// released transition can be told apart from a select line that simply
/// stays high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deserializer {
    message: u16,
    count: u8,
    selected: bool,
}

impl Deserializer {
    pub const fn new() -> Self {
        Self {
            message: 0,
            count: 0,
            selected: false,
        }
    }

    pub const fn message(&self) -> u16 {
        self.message
    }

    pub const fn bit_count(&self) -> u8 {
        self.count
    }

    pub const fn is_full(&self) -> bool {
        self.count == FRAME_BITS
    }

    /// Next state given the synchronized select level, the clock edge pulse
    /// and the synchronized data bit of the previous tick.
    pub fn step(&self, selected: bool, edge: bool, bit: bool, policy: CounterPolicy) -> FrameStep {
        let mut message = self.message;
        let mut count = self.count;

        if selected && !self.selected && policy == CounterPolicy::RearmOnSelect {
            count = 0;
        }

        let mut shifted = None;
        if selected && edge && count < FRAME_BITS {
            message = (message << 1) | u16::from(bit);
            count += 1;
            shifted = Some(bit);
        }

        let released = if !selected && self.selected {
            Some(if count == FRAME_BITS {
                Release::Complete
            } else {
                Release::Short { bits: count }
            })
        } else {
            None
        };

        FrameStep {
            next: Self {
                message,
                count,
                selected,
            },
            shifted,
            released,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: CounterPolicy = CounterPolicy::HoldUntilReset;

    fn shift_word(mut frame: Deserializer, word: u16, bits: u8, policy: CounterPolicy) -> Deserializer {
        for i in (0..bits).rev() {
            let bit = (word >> i) & 1 == 1;
            frame = frame.step(true, true, bit, policy).next;
        }
        frame
    }

    #[test]
    fn shifts_msb_first() {
        let frame = shift_word(Deserializer::new(), 0b1000_0000_0000_0101, 16, HOLD);
        assert_eq!(frame.message(), 0x8005);
        assert!(frame.is_full());
    }

    #[test]
    fn no_shift_without_edge_or_select() {
        let frame = Deserializer::new();
        let step = frame.step(true, false, true, HOLD);
        assert_eq!(step.shifted, None);
        assert_eq!(step.next.bit_count(), 0);

        let step = frame.step(false, true, true, HOLD);
        assert_eq!(step.shifted, None);
        assert_eq!(step.next.bit_count(), 0);
    }

    #[test]
    fn full_frame_ignores_extra_edges() {
        let frame = shift_word(Deserializer::new(), 0xA55A, 16, HOLD);
        let frame = shift_word(frame, 0xFFFF, 5, HOLD);
        assert_eq!(frame.message(), 0xA55A);
        assert_eq!(frame.bit_count(), 16);
    }

    #[test]
    fn release_after_full_frame_is_complete() {
        let frame = shift_word(Deserializer::new(), 0x1234, 16, HOLD);
        let step = frame.step(false, false, false, HOLD);
        assert_eq!(step.released, Some(Release::Complete));

        // still released on the next tick: no second announcement
        let step = step.next.step(false, false, false, HOLD);
        assert_eq!(step.released, None);
    }

    #[test]
    fn short_frame_keeps_partial_count() {
        let frame = shift_word(Deserializer::new(), 0x84, 8, HOLD);
        let step = frame.step(false, false, false, HOLD);
        assert_eq!(step.released, Some(Release::Short { bits: 8 }));
        assert_eq!(step.next.bit_count(), 8);
        assert_eq!(step.next.message(), 0x84);
    }

    #[test]
    fn hold_policy_never_rearms() {
        let frame = shift_word(Deserializer::new(), 0x8105, 16, HOLD);
        let frame = frame.step(false, false, false, HOLD).next;
        let frame = shift_word(frame, 0x81CC, 16, HOLD);
        assert_eq!(frame.message(), 0x8105);
        assert_eq!(
            frame.step(false, false, false, HOLD).released,
            Some(Release::Complete)
        );
    }

    #[test]
    fn rearm_policy_clears_counter_on_select() {
        let policy = CounterPolicy::RearmOnSelect;
        let frame = shift_word(Deserializer::new(), 0x8105, 16, policy);
        let frame = frame.step(false, false, false, policy).next;
        let frame = shift_word(frame, 0x81CC, 16, policy);
        assert_eq!(frame.message(), 0x81CC);
    }
}
