use crate::{address::DeviceAddress, speed::BusSpeed};
use std::time::Duration;
use tracing::debug;

/// Capability interface of an I2C bus master.
///
/// `close` consumes the handle, so a handle can not be closed twice and a
/// failed `open` leaves nothing to close.
pub trait Transport {
    type Handle;
    type Error: std::error::Error + Send + Sync + 'static;

    fn open(&mut self, bus: u8) -> Result<Self::Handle, Self::Error>;

    fn close(&mut self, handle: Self::Handle);

    fn set_speed(&mut self, handle: &mut Self::Handle, speed: BusSpeed) -> Result<(), Self::Error>;

    fn set_timeout(&mut self, handle: &mut Self::Handle, timeout: Duration)
        -> Result<(), Self::Error>;

    /// Reads into `buffer` from the device at `address`, returning the
    /// number of bytes read. Any error, including a NACK, means no device
    /// responded.
    fn read(
        &mut self,
        handle: &mut Self::Handle,
        address: DeviceAddress,
        buffer: &mut [u8],
    ) -> Result<usize, Self::Error>;

    /// Whether the transport can issue a transaction to `address` at all.
    /// Addresses it can not reach are left out of the sweep.
    fn can_address(&self, _address: DeviceAddress) -> bool {
        true
    }

    /// Releases anything held beyond individual handles.
    fn shutdown(&mut self) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Handle = T::Handle;
    type Error = T::Error;

    fn open(&mut self, bus: u8) -> Result<Self::Handle, Self::Error> {
        (**self).open(bus)
    }

    fn close(&mut self, handle: Self::Handle) {
        (**self).close(handle)
    }

    fn set_speed(&mut self, handle: &mut Self::Handle, speed: BusSpeed) -> Result<(), Self::Error> {
        (**self).set_speed(handle, speed)
    }

    fn set_timeout(&mut self, handle: &mut Self::Handle, timeout: Duration)
        -> Result<(), Self::Error> {
        (**self).set_timeout(handle, timeout)
    }

    fn read(
        &mut self,
        handle: &mut Self::Handle,
        address: DeviceAddress,
        buffer: &mut [u8],
    ) -> Result<usize, Self::Error> {
        (**self).read(handle, address, buffer)
    }

    fn can_address(&self, address: DeviceAddress) -> bool {
        (**self).can_address(address)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// An open bus handle, closed when the session is closed or dropped.
pub struct Session<'t, T: Transport> {
    transport: &'t mut T,
    handle: Option<T::Handle>,
    bus: u8,
}

impl<'t, T: Transport> Session<'t, T> {
    pub fn open(transport: &'t mut T, bus: u8) -> Result<Self, T::Error> {
        let handle = transport.open(bus)?;
        debug!("Opened I2C bus {}", bus);
        Ok(Session {
            transport,
            handle: Some(handle),
            bus,
        })
    }

    pub fn set_speed(&mut self, speed: BusSpeed) -> Result<(), T::Error> {
        let (transport, handle) = self.parts();
        transport.set_speed(handle, speed)
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), T::Error> {
        let (transport, handle) = self.parts();
        transport.set_timeout(handle, timeout)
    }

    pub fn read(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> Result<usize, T::Error> {
        let (transport, handle) = self.parts();
        transport.read(handle, address, buffer)
    }

    pub fn can_address(&self, address: DeviceAddress) -> bool {
        self.transport.can_address(address)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn parts(&mut self) -> (&mut T, &mut T::Handle) {
        match self.handle.as_mut() {
            Some(handle) => (&mut *self.transport, handle),
            None => unreachable!("handle is only taken when the session is closed"),
        }
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.transport.close(handle);
            debug!("Closed I2C bus {}", self.bus);
        }
    }
}

impl<'t, T: Transport> Drop for Session<'t, T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
pub mod mock {
    use super::Transport;
    use crate::{address::DeviceAddress, speed::BusSpeed};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use thiserror::Error;

    /// Simulated bus that acknowledges a planned set of addresses and
    /// counts every interaction.
    pub struct MockTransport {
        acks: [bool; DeviceAddress::COUNT],
        reachable: (u8, u8),
        terminate_on_open: Option<&'static AtomicBool>,
        fail_open: bool,
        fail_speed: bool,
        fail_timeout: bool,
        opened: usize,
        closed: usize,
        shutdowns: usize,
        reads: Vec<u8>,
        speeds: Vec<BusSpeed>,
        timeouts: Vec<Duration>,
    }

    pub struct MockHandle {
        _bus: u8,
    }

    #[derive(Debug, Error)]
    pub enum MockError {
        #[error("no such bus")]
        NoSuchBus,
        #[error("speed not supported")]
        Speed,
        #[error("timeout not supported")]
        Timeout,
        #[error("address not acknowledged")]
        Nack,
    }

    impl MockTransport {
        pub fn builder() -> Builder {
            Builder {
                acks: vec![],
                reachable: (0x00, 0x7F),
                terminate_on_open: None,
                fail_open: false,
                fail_speed: false,
                fail_timeout: false,
            }
        }

        pub fn opened(&self) -> usize {
            self.opened
        }

        pub fn closed(&self) -> usize {
            self.closed
        }

        pub fn shutdowns(&self) -> usize {
            self.shutdowns
        }

        /// Addresses read from, in order of the reads.
        pub fn reads(&self) -> &[u8] {
            &self.reads[..]
        }

        pub fn speeds(&self) -> &[BusSpeed] {
            &self.speeds[..]
        }

        pub fn timeouts(&self) -> &[Duration] {
            &self.timeouts[..]
        }
    }

    impl Transport for MockTransport {
        type Handle = MockHandle;
        type Error = MockError;

        fn open(&mut self, bus: u8) -> Result<MockHandle, MockError> {
            if let Some(flag) = self.terminate_on_open {
                flag.store(true, Ordering::Relaxed);
            }
            if self.fail_open {
                return Err(MockError::NoSuchBus);
            }
            self.opened += 1;
            Ok(MockHandle { _bus: bus })
        }

        fn close(&mut self, _handle: MockHandle) {
            self.closed += 1;
        }

        fn set_speed(&mut self, _handle: &mut MockHandle, speed: BusSpeed) -> Result<(), MockError> {
            if self.fail_speed {
                return Err(MockError::Speed);
            }
            self.speeds.push(speed);
            Ok(())
        }

        fn set_timeout(
            &mut self,
            _handle: &mut MockHandle,
            timeout: Duration,
        ) -> Result<(), MockError> {
            if self.fail_timeout {
                return Err(MockError::Timeout);
            }
            self.timeouts.push(timeout);
            Ok(())
        }

        fn read(
            &mut self,
            _handle: &mut MockHandle,
            address: DeviceAddress,
            buffer: &mut [u8],
        ) -> Result<usize, MockError> {
            assert!(
                !address.is_general_call(),
                "The general call address must never be read from"
            );
            assert!(!buffer.is_empty(), "Zero-length reads are not supported");
            assert!(
                self.can_address(address),
                "Read from unreachable address {}",
                address
            );
            self.reads.push(address.value());
            if self.acks[address.index()] {
                buffer[0] = 0xA5;
                Ok(1)
            } else {
                Err(MockError::Nack)
            }
        }

        fn can_address(&self, address: DeviceAddress) -> bool {
            let (first, last) = self.reachable;
            (first..=last).contains(&address.value())
        }

        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    pub struct Builder {
        acks: Vec<u8>,
        reachable: (u8, u8),
        terminate_on_open: Option<&'static AtomicBool>,
        fail_open: bool,
        fail_speed: bool,
        fail_timeout: bool,
    }

    impl Builder {
        /// Plans a device at the given address that acknowledges reads.
        pub fn ack(&mut self, address: u8) -> &mut Self {
            self.acks.push(address);
            self
        }

        /// Limits transactions to addresses in `first..=last`.
        pub fn reachable(&mut self, first: u8, last: u8) -> &mut Self {
            self.reachable = (first, last);
            self
        }

        /// Sets the given flag whenever the bus is opened, as if a
        /// termination signal arrived during the pass.
        pub fn terminate_on_open(&mut self, flag: &'static AtomicBool) -> &mut Self {
            self.terminate_on_open = Some(flag);
            self
        }

        pub fn fail_open(&mut self) -> &mut Self {
            self.fail_open = true;
            self
        }

        pub fn fail_speed(&mut self) -> &mut Self {
            self.fail_speed = true;
            self
        }

        pub fn fail_timeout(&mut self) -> &mut Self {
            self.fail_timeout = true;
            self
        }

        /// Finish the build.
        ///
        /// Can safely be called multiple times.
        pub fn build(&self) -> MockTransport {
            let mut acks = [false; DeviceAddress::COUNT];
            for &address in &self.acks {
                acks[address as usize] = true;
            }
            MockTransport {
                acks,
                reachable: self.reachable,
                terminate_on_open: self.terminate_on_open,
                fail_open: self.fail_open,
                fail_speed: self.fail_speed,
                fail_timeout: self.fail_timeout,
                opened: 0,
                closed: 0,
                shutdowns: 0,
                reads: vec![],
                speeds: vec![],
                timeouts: vec![],
            }
        }
    }
}
