use std::fmt;

use serde::{Deserialize, Serialize};

/// Addressable output registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Register {
    OutputEnableLow,
    OutputEnableHigh,
    PwmEnableLow,
    PwmEnableHigh,
    PwmDutyCycle,
}

impl Register {
    pub const ALL: [Register; 5] = [
        Register::OutputEnableLow,
        Register::OutputEnableHigh,
        Register::PwmEnableLow,
        Register::PwmEnableHigh,
        Register::PwmDutyCycle,
    ];

    pub const fn address(self) -> u8 {
        self as u8
    }

    /// Addresses 0x05..=0x7F are reserved and map to nothing.
    pub const fn from_address(address: u8) -> Option<Self> {
        match address {
            0x00 => Some(Register::OutputEnableLow),
            0x01 => Some(Register::OutputEnableHigh),
            0x02 => Some(Register::PwmEnableLow),
            0x03 => Some(Register::PwmEnableHigh),
            0x04 => Some(Register::PwmDutyCycle),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::OutputEnableLow => "output_enable_low",
            Register::OutputEnableHigh => "output_enable_high",
            Register::PwmEnableLow => "pwm_enable_low",
            Register::PwmEnableHigh => "pwm_enable_high",
            Register::PwmDutyCycle => "pwm_duty_cycle",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register file state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u8; 5],
}

impl RegisterFile {
    pub const fn new() -> Self {
        Self { regs: [0; 5] }
    }

    pub const fn get(&self, reg: Register) -> u8 {
        self.regs[reg as usize]
    }

    /// Copy of the file with `reg` replaced by `value`.
    pub const fn with(mut self, reg: Register, value: u8) -> Self {
        self.regs[reg as usize] = value;
        self
    }

    pub const fn output_enable_low(&self) -> u8 {
        self.get(Register::OutputEnableLow)
    }

    pub const fn output_enable_high(&self) -> u8 {
        self.get(Register::OutputEnableHigh)
    }

    pub const fn pwm_enable_low(&self) -> u8 {
        self.get(Register::PwmEnableLow)
    }

    pub const fn pwm_enable_high(&self) -> u8 {
        self.get(Register::PwmEnableHigh)
    }

    pub const fn pwm_duty_cycle(&self) -> u8 {
        self.get(Register::PwmDutyCycle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u8)> + '_ {
        Register::ALL.into_iter().map(|reg| (reg, self.get(reg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_map_round_trips() {
        for reg in Register::ALL {
            assert_eq!(Register::from_address(reg.address()), Some(reg));
        }
        assert_eq!(Register::from_address(0x05), None);
        assert_eq!(Register::from_address(0x7F), None);
    }

    #[test]
    fn with_replaces_single_register() {
        let regs = RegisterFile::new().with(Register::PwmDutyCycle, 0x7F);
        assert_eq!(regs.pwm_duty_cycle(), 0x7F);
        assert_eq!(regs.output_enable_low(), 0);
        assert_eq!(regs.output_enable_high(), 0);
        assert_eq!(regs.pwm_enable_low(), 0);
        assert_eq!(regs.pwm_enable_high(), 0);
    }
}
