/// Consumption handshake between the deserializer and the register decoder.
///
/// The externally visible `received`/`processed` flags are derived from the
/// state: `Idle` is `00`, `Available` is `10`, `Consuming` is `11`. A frame
/// therefore always walks `10 -> 11 -> 00` and is decoded on the single
/// `Available -> Consuming` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handshake {
    #[default]
    Idle,
    Available,
    Consuming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeStep {
    pub next: Handshake,
    /// Decode the stored message on this tick.
    pub consume: bool,
    /// A frame was announced while the previous one was still in flight.
    pub dropped: bool,
}

impl Handshake {
    pub const fn received(self) -> bool {
        matches!(self, Self::Available | Self::Consuming)
    }

    pub const fn processed(self) -> bool {
        matches!(self, Self::Consuming)
    }

    pub const fn step(self, announced: bool) -> HandshakeStep {
        match self {
            Self::Idle => HandshakeStep {
                next: if announced { Self::Available } else { Self::Idle },
                consume: false,
                dropped: false,
            },
            Self::Available => HandshakeStep {
                next: Self::Consuming,
                consume: true,
                dropped: announced,
            },
            Self::Consuming => HandshakeStep {
                next: Self::Idle,
                consume: false,
                dropped: announced,
            },
        }
    }
}
