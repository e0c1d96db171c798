use crate::{
    address::DeviceAddress,
    report,
    speed::BusSpeed,
    transport::{Session, Transport},
};
use std::io::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shortest read the reference hardware supports, zero-length reads fail.
const PROBE_LEN: usize = 1;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Presence of every 7-bit address on a bus at one speed.
///
/// The general call address is always `Absent` and never probed, as are
/// addresses the transport can not reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    speed: BusSpeed,
    presence: [Presence; DeviceAddress::COUNT],
    probed: [bool; DeviceAddress::COUNT],
    complete: bool,
}

impl ScanResult {
    /// Result of a pass that was aborted before any address was probed.
    pub fn aborted(speed: BusSpeed) -> Self {
        ScanResult {
            speed,
            presence: [Presence::Absent; DeviceAddress::COUNT],
            probed: [false; DeviceAddress::COUNT],
            complete: false,
        }
    }

    #[cfg(test)]
    pub fn with_present(speed: BusSpeed, present: &[u8]) -> Self {
        let mut presence = [Presence::Absent; DeviceAddress::COUNT];
        for &address in present {
            let address = DeviceAddress::try_from(address).expect("test address out of range");
            assert!(!address.is_general_call());
            presence[address.index()] = Presence::Present;
        }
        let mut probed = [true; DeviceAddress::COUNT];
        probed[DeviceAddress::GENERAL_CALL.index()] = false;
        ScanResult {
            speed,
            presence,
            probed,
            complete: true,
        }
    }

    pub fn speed(&self) -> BusSpeed {
        self.speed
    }

    /// `false` if the bus could not be opened or configured.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn get(&self, address: DeviceAddress) -> Presence {
        self.presence[address.index()]
    }

    pub fn is_present(&self, address: DeviceAddress) -> bool {
        self.get(address) == Presence::Present
    }

    /// `false` for addresses that got no transaction during the pass.
    pub fn was_probed(&self, address: DeviceAddress) -> bool {
        self.probed[address.index()]
    }

    /// Every address with its presence, `0x00` first.
    #[cfg(test)]
    pub fn entries(&self) -> impl Iterator<Item = (DeviceAddress, Presence)> + '_ {
        DeviceAddress::all().map(move |address| (address, self.get(address)))
    }

    /// Addresses that acknowledged, in increasing order.
    pub fn present(&self) -> impl Iterator<Item = DeviceAddress> + '_ {
        DeviceAddress::probed().filter(move |address| self.is_present(*address))
    }
}

/// Sweeps the address space of one bus.
#[derive(Debug, Clone)]
pub struct Scanner {
    bus: u8,
    timeout: Duration,
}

impl Scanner {
    pub fn new(bus: u8, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    /// Probes addresses `0x01..=0x7F` at the given speed, writing the report
    /// to `out` row by row as the sweep goes.
    ///
    /// Never fails: if the bus can not be opened or configured, the error is
    /// logged and an aborted, all absent result is returned.
    #[tracing::instrument(skip(self, transport, out), fields(bus = self.bus))]
    pub fn scan<T, W>(&self, transport: &mut T, speed: BusSpeed, out: &mut W) -> ScanResult
    where
        T: Transport,
        W: Write,
    {
        match self.try_scan(transport, speed, out) {
            Ok(result) => {
                emit(out, "");
                emit(out, &report::summary(&result));
                emit(out, "");
                result
            }
            Err(err) => {
                if err.is_unsupported_speed() {
                    warn!("{}", err);
                } else {
                    error!("{}", err);
                }
                let result = ScanResult::aborted(speed);
                if let Err(err) = out.write_all(report::render(&result).as_bytes()) {
                    warn!("Could not write scan report: {}", err);
                }
                result
            }
        }
    }

    fn try_scan<T, W>(
        &self,
        transport: &mut T,
        speed: BusSpeed,
        out: &mut W,
    ) -> Result<ScanResult, ScanError>
    where
        T: Transport,
        W: Write,
    {
        let mut session = Session::open(transport, self.bus).map_err(|e| ScanError::Open {
            bus: self.bus,
            source: Box::new(e),
        })?;

        session.set_speed(speed).map_err(|e| ScanError::Speed {
            speed,
            source: Box::new(e),
        })?;

        session.set_timeout(self.timeout).map_err(|e| ScanError::Timeout {
            timeout_ms: self.timeout.as_millis(),
            source: Box::new(e),
        })?;

        let result = sweep(&mut session, speed, out);
        session.close();
        Ok(result)
    }
}

fn sweep<T, W>(session: &mut Session<'_, T>, speed: BusSpeed, out: &mut W) -> ScanResult
where
    T: Transport,
    W: Write,
{
    let mut result = ScanResult {
        speed,
        presence: [Presence::Absent; DeviceAddress::COUNT],
        probed: [false; DeviceAddress::COUNT],
        complete: true,
    };

    emit(out, &report::speed_header(speed));
    emit(out, &report::column_header());
    let mut buf = [0_u8; PROBE_LEN];
    for address in DeviceAddress::all() {
        if address.is_general_call() {
            continue;
        }

        if !session.can_address(address) {
            trace!("Skipping {}, not reachable by the transport", address);
        } else {
            result.probed[address.index()] = true;
            result.presence[address.index()] = match session.read(address, &mut buf) {
                Ok(_) => {
                    debug!("Device at {} acknowledged", address);
                    Presence::Present
                }
                Err(err) => {
                    trace!("No device at {}: {}", address, err);
                    Presence::Absent
                }
            };
        }

        if address.low_nibble() == 0x0F {
            emit(out, &report::row(&result, address.high_nibble()));
        }
    }

    result
}

fn emit<W: Write>(out: &mut W, line: &str) {
    if let Err(err) = writeln!(out, "{}", line) {
        warn!("Could not write scan report: {}", err);
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Could not open I2C bus {bus}, due to error: {source}")]
    Open { bus: u8, source: BoxError },
    #[error("Failed to set I2C bus speed to {speed}, error: {source}")]
    Speed { speed: BusSpeed, source: BoxError },
    #[error("Failed to set I2C bus timeout to {timeout_ms} ms, error: {source}")]
    Timeout { timeout_ms: u128, source: BoxError },
}

impl ScanError {
    /// The bus could not run at the requested speed, usually a property of
    /// the adapter rather than a fault.
    pub fn is_unsupported_speed(&self) -> bool {
        matches!(self, ScanError::Speed { .. })
    }
}
