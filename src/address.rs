//! Validated 7-bit I2C device addresses.

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// A 7-bit I2C address in range `0x00..=0x7F`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// The general call address, addresses every device at once and is
    /// never probed on its own.
    pub const GENERAL_CALL: DeviceAddress = DeviceAddress(0x00);
    pub const MAX: DeviceAddress = DeviceAddress(0x7F);

    /// Number of addresses in the 7-bit address space, including the
    /// general call address.
    pub const COUNT: usize = 0x80;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Upper three bits, i.e. the row of the report grid.
    pub fn high_nibble(self) -> u8 {
        self.0 & 0x70
    }

    pub fn low_nibble(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn is_general_call(self) -> bool {
        self == Self::GENERAL_CALL
    }

    /// All addresses from `0x00` to `0x7F`, in increasing order.
    pub fn all() -> Addresses {
        Addresses { next: 0x00 }
    }

    /// Addresses that get a transaction during a scan, `0x01` to `0x7F`.
    pub fn probed() -> Addresses {
        Addresses { next: 0x01 }
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > Self::MAX.0 {
            return Err(AddressError::OutOfRange(value));
        }
        Ok(DeviceAddress(value))
    }
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> u8 {
        address.0
    }
}

impl Display for DeviceAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Addresses {
    next: u8,
}

impl Iterator for Addresses {
    type Item = DeviceAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > DeviceAddress::MAX.0 {
            return None;
        }

        let address = DeviceAddress(self.next);
        self.next += 1;
        Some(address)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("I2C address 0x{0:02X} is outside the 7-bit address range 0x00..=0x7F")]
    OutOfRange(u8),
}
