use thiserror::Error;

/// Errors raised by the simulation tooling around the peripheral.
///
/// The peripheral itself never fails: anomalous bus traffic is absorbed
/// silently. These variants cover host-side command construction, trace
/// output and configuration.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("register address 0x{0:02x} does not fit in 7 bits")]
    AddressOutOfRange(u8),

    #[error("a frame carries at most 16 bits, got {0}")]
    FrameTooLong(u8),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration")]
    Parse(#[from] serde_yaml::Error),

    #[error("trace output failed")]
    Io(#[from] std::io::Error),
}
