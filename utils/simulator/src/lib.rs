mod config;
mod core;
mod decoder;
mod deserializer;
mod edge;
mod error;
mod handshake;
mod host;
mod peripheral;
mod register_file;
mod synchronizer;
pub mod vcd;

// Re-export public API
pub use config::{Config, PeripheralConfig};
pub use crate::core::{RunStats, Simulator};
pub use decoder::{Command, Decoded, decode};
pub use deserializer::{CounterPolicy, FRAME_BITS, Release};
pub use edge::clock_rising;
pub use error::SimError;
pub use handshake::Handshake;
pub use host::{BusTiming, MIN_SETTLE_CYCLES, SpiHost, Waveform};
pub use peripheral::{Peripheral, PinLevels, TickInputs, TickOutputs};
pub use register_file::{Register, RegisterFile};
pub use synchronizer::{SYNC_STAGES, SyncedSignal};
