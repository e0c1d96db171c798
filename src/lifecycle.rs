//! Signal handling and ownership of the transport for the whole run.

use crate::{
    config::Config,
    scan::{ScanResult, Scanner},
    transport::Transport,
};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Set by the signal handler, read by the run loop before each pass.
/// Once set it is never cleared.
static TERMINATION_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn termination_handler(_signal: libc::c_int) {
    // only async-signal-safe operations here, no logging
    TERMINATION_REQUESTED.store(true, Ordering::Relaxed);
}

fn install_handlers() -> Result<(), LifecycleError> {
    for &signal in &[libc::SIGTERM, libc::SIGINT] {
        let handler = termination_handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
        let previous = unsafe { libc::signal(signal, handler) };
        if previous == libc::SIG_ERR {
            return Err(LifecycleError::Signal {
                signal,
                source: io::Error::last_os_error(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: usize,
    pub aborted: usize,
    /// Termination was requested before every configured speed was scanned.
    pub interrupted: bool,
    pub results: Vec<ScanResult>,
}

pub struct Lifecycle<T: Transport> {
    transport: Option<T>,
    termination: &'static AtomicBool,
}

impl<T: Transport> Lifecycle<T> {
    pub fn new(transport: T) -> Self {
        Self::with_flag(transport, &TERMINATION_REQUESTED)
    }

    /// Uses the given flag in place of the one set by the signal handler.
    pub fn with_flag(transport: T, termination: &'static AtomicBool) -> Self {
        Lifecycle {
            transport: Some(transport),
            termination,
        }
    }

    /// Installs handlers for SIGTERM and SIGINT. If that fails, termination
    /// is requested right away so no scan runs.
    pub fn initialize(&self) -> Result<(), LifecycleError> {
        install_handlers().map_err(|err| {
            error!("{}", err);
            self.termination.store(true, Ordering::Relaxed);
            err
        })
    }

    pub fn termination_requested(&self) -> bool {
        self.termination.load(Ordering::Relaxed)
    }

    /// Scans once per configured speed, fastest first, writing the reports
    /// to `out`. Stops before the next pass once termination is requested.
    #[tracing::instrument(skip(self, config, out))]
    pub fn run<W: Write>(&mut self, config: &Config, out: &mut W) -> RunSummary {
        let termination = self.termination;
        let mut summary = RunSummary::default();
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => {
                warn!("Transport already released, not scanning");
                return summary;
            }
        };

        let scanner = Scanner::new(config.bus, config.timeout());
        for speed in config.sweep_order() {
            if termination.load(Ordering::Relaxed) {
                warn!("Termination requested, skipping scan at {} and later", speed);
                summary.interrupted = true;
                break;
            }

            let result = scanner.scan(transport, speed, out);
            if result.is_complete() {
                summary.completed += 1;
            } else {
                summary.aborted += 1;
            }
            summary.results.push(result);
        }

        debug!(
            "Finished with {} complete and {} aborted scans",
            summary.completed, summary.aborted
        );
        summary
    }

    /// Releases the transport. Does nothing when called again.
    pub fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.shutdown();
            debug!("Transport released");
        }
    }
}

impl<T: Transport> Drop for Lifecycle<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not install handler for signal {signal}, error: {source}")]
    Signal { signal: libc::c_int, source: io::Error },
}
