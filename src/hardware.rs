//! Transport for the I2C controllers of Raspberry Pi boards, through the
//! Linux `/dev/i2c-*` character devices.

use crate::{address::DeviceAddress, speed::BusSpeed, transport::Transport};
use rppal::i2c::I2c;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// 7-bit addresses `rppal` accepts as slave address, the range `i2cdetect`
/// probes by default.
const FIRST_REACHABLE: u8 = 0x03;
const LAST_REACHABLE: u8 = 0x77;

#[derive(Debug, Default)]
pub struct RaspberryPi;

impl Transport for RaspberryPi {
    type Handle = I2c;
    type Error = HardwareError;

    fn open(&mut self, bus: u8) -> Result<I2c, HardwareError> {
        Ok(I2c::with_bus(bus)?)
    }

    fn close(&mut self, handle: I2c) {
        // the file descriptor is closed on drop
        drop(handle);
    }

    /// The clock of a Linux I2C adapter is fixed by the device tree, so this
    /// only checks that the bus already runs at the requested speed.
    fn set_speed(&mut self, handle: &mut I2c, speed: BusSpeed) -> Result<(), HardwareError> {
        let actual = handle.clock_speed()?;
        debug!("Bus clock is {} Hz", actual);
        if actual != speed.hz() {
            return Err(HardwareError::FixedClock {
                requested: speed,
                actual,
            });
        }
        Ok(())
    }

    fn set_timeout(&mut self, handle: &mut I2c, timeout: Duration) -> Result<(), HardwareError> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        handle.set_timeout(millis)?;
        Ok(())
    }

    fn can_address(&self, address: DeviceAddress) -> bool {
        (FIRST_REACHABLE..=LAST_REACHABLE).contains(&address.value())
    }

    fn read(
        &mut self,
        handle: &mut I2c,
        address: DeviceAddress,
        buffer: &mut [u8],
    ) -> Result<usize, HardwareError> {
        handle.set_slave_address(u16::from(address.value()))?;
        Ok(handle.read(buffer)?)
    }
}

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("{0}")]
    I2c(#[from] rppal::i2c::Error),
    #[error("bus clock is fixed at {actual} Hz by the kernel and can not be switched to {requested}")]
    FixedClock { requested: BusSpeed, actual: u32 },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reachable_addresses() {
        let reachable: Vec<u8> = DeviceAddress::all()
            .filter(|address| RaspberryPi.can_address(*address))
            .map(u8::from)
            .collect();
        assert_eq!(reachable.first(), Some(&0x03));
        assert_eq!(reachable.last(), Some(&0x77));
        assert_eq!(reachable.len(), 0x75);
    }
}
