use crate::speed::BusSpeed;
use argh::FromArgs;
use std::path::PathBuf;

/// Probe every address of an I2C bus and report which devices acknowledge.
///
/// Without options, scans bus 1 at 1 MHz, 400 kHz and 100 kHz, in that order.
#[derive(FromArgs, Debug)]
pub struct TopLevel {
    /// path to a YAML configuration file, options given on the command line
    /// take precedence over it.
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,
    /// number of the I2C bus to scan, e.g. 1 for /dev/i2c-1.
    #[argh(option, short = 'b')]
    pub bus: Option<u8>,
    /// speed to scan at, one of standard, fast, fast_plus or 100k, 400k, 1m.
    /// Repeat to scan at several speeds. On Linux the bus clock is fixed by
    /// the device tree, scans at other speeds are skipped with a warning.
    #[argh(option, short = 's')]
    pub speed: Vec<BusSpeed>,
    /// maximum time in milliseconds to wait for a device to respond.
    #[argh(option, short = 't')]
    pub timeout_ms: Option<u64>,
    /// exit with a non-zero code if a scan fails or gets interrupted.
    #[argh(switch)]
    pub strict: bool,
    /// print debug output.
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}
