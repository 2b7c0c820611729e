use std::fmt;

use crate::SimError;
use crate::register_file::{Register, RegisterFile};

const WRITE_FLAG: u16 = 1 << 15;
const ADDRESS_MASK: u8 = 0x7F;

/// One 16-bit bus command: write flag, 7-bit address, 8-bit payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    write: bool,
    address: u8,
    data: u8,
}

impl Command {
    pub fn new(write: bool, address: u8, data: u8) -> Result<Self, SimError> {
        if address > ADDRESS_MASK {
            return Err(SimError::AddressOutOfRange(address));
        }
        Ok(Self {
            write,
            address,
            data,
        })
    }

    pub fn write(address: u8, data: u8) -> Result<Self, SimError> {
        Self::new(true, address, data)
    }

    pub fn read(address: u8, data: u8) -> Result<Self, SimError> {
        Self::new(false, address, data)
    }

    pub const fn from_word(word: u16) -> Self {
        Self {
            write: word & WRITE_FLAG != 0,
            address: (word >> 8) as u8 & ADDRESS_MASK,
            data: word as u8,
        }
    }

    pub const fn to_word(self) -> u16 {
        let flag = if self.write { WRITE_FLAG } else { 0 };
        flag | ((self.address as u16) << 8) | self.data as u16
    }

    pub const fn is_write(&self) -> bool {
        self.write
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn data(&self) -> u8 {
        self.data
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.write { "write" } else { "read" };
        write!(f, "{kind} 0x{:02x} <- 0x{:02x}", self.address, self.data)
    }
}

/// Outcome of decoding one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Write { register: Register, data: u8 },
    /// Write-enable clear: read or reserved command, consumed without effect.
    NotWrite { address: u8 },
    /// Write to an address outside the register map.
    Unmapped { address: u8 },
}

pub const fn decode(word: u16) -> Decoded {
    let command = Command::from_word(word);
    if !command.write {
        return Decoded::NotWrite {
            address: command.address,
        };
    }
    match Register::from_address(command.address) {
        Some(register) => Decoded::Write {
            register,
            data: command.data,
        },
        None => Decoded::Unmapped {
            address: command.address,
        },
    }
}

impl RegisterFile {
    /// Register file after applying a decoded command.
    pub const fn commit(self, decoded: Decoded) -> Self {
        match decoded {
            Decoded::Write { register, data } => self.with(register, data),
            Decoded::NotWrite { .. } | Decoded::Unmapped { .. } => self,
        }
    }
}
