//! Runtime configuration of a scan run.
//!
//! Read from an optional YAML file, e.g.
//!
//! ```yaml
//! bus: 1
//! speeds: [fast, standard]
//! timeout_ms: 100
//! exit_policy: fail_on_error
//! ```
//!
//! Every key is optional, command line options override the file.

use crate::{args::TopLevel, lifecycle::RunSummary, speed::BusSpeed};
use serde::Deserialize;
use serde_yaml::from_reader;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BUS: u8 = 1;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Exit code when termination was requested before all passes ran.
const EXIT_INTERRUPTED: u8 = 130;
const EXIT_SCAN_FAILED: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bus: u8,
    /// Speeds to sweep at, always run fastest first.
    pub speeds: Vec<BusSpeed>,
    pub timeout_ms: u64,
    pub exit_policy: ExitPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: DEFAULT_BUS,
            speeds: BusSpeed::ALL.to_vec(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            exit_policy: ExitPolicy::AlwaysZero,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|e| ConfigError::io(e, path))?;
        let config: Config = from_reader(file).map_err(|e| ConfigError::deserialize(e, path))?;
        config.validate()
    }

    /// Configuration file given on the command line, if any, with the other
    /// command line options applied on top.
    pub fn from_args(args: &TopLevel) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(bus) = args.bus {
            config.bus = bus;
        }
        if !args.speed.is_empty() {
            config.speeds = args.speed.clone();
        }
        if let Some(timeout_ms) = args.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if args.strict {
            config.exit_policy = ExitPolicy::FailOnError;
        }

        config.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Configured speeds, fastest first and without duplicates.
    pub fn sweep_order(&self) -> Vec<BusSpeed> {
        BusSpeed::sweep_order(&self.speeds)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.speeds.is_empty() {
            return Err(ConfigError::NoSpeeds);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }
}

/// Decides the process exit code after a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Always exit with 0, failures are only logged.
    AlwaysZero,
    /// Exit with 1 if a pass was aborted, or with 130 if termination was
    /// requested before all passes ran.
    FailOnError,
}

impl ExitPolicy {
    pub fn exit_code(self, summary: &RunSummary) -> u8 {
        match self {
            ExitPolicy::AlwaysZero => 0,
            ExitPolicy::FailOnError if summary.interrupted => EXIT_INTERRUPTED,
            ExitPolicy::FailOnError if summary.aborted > 0 => EXIT_SCAN_FAILED,
            ExitPolicy::FailOnError => 0,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not open specified YAML configuration file {path:?}: {source}")]
    IO {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Could not parse specified YAML configuration file {path:?}: {source}")]
    Deserialize {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("At least one bus speed must be configured")]
    NoSpeeds,
    #[error("The bus timeout must be at least 1 ms")]
    ZeroTimeout,
}

impl ConfigError {
    fn io(source: std::io::Error, path: &Path) -> Self {
        Self::IO {
            source,
            path: path.into(),
        }
    }

    fn deserialize(source: serde_yaml::Error, path: &Path) -> Self {
        Self::Deserialize {
            source,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_yaml::from_str;

    fn args(args: &[&str]) -> TopLevel {
        argh::FromArgs::from_args(&["i2cscan"], args).unwrap()
    }

    #[test]
    fn defaults_scan_all_speeds_fastest_first() {
        let config = Config::from_args(&args(&[])).unwrap();
        assert_eq!(config.bus, 1);
        assert_eq!(config.timeout(), Duration::from_millis(100));
        assert_eq!(config.exit_policy, ExitPolicy::AlwaysZero);
        assert_eq!(
            config.sweep_order(),
            vec![BusSpeed::FastPlus, BusSpeed::Fast, BusSpeed::Standard]
        );
    }

    #[test]
    fn deserialize_partial() {
        let config: Config = from_str("speeds: [standard, 1m]\nexit_policy: fail_on_error\n").unwrap();
        assert_eq!(
            config,
            Config {
                bus: DEFAULT_BUS,
                speeds: vec![BusSpeed::Standard, BusSpeed::FastPlus],
                timeout_ms: DEFAULT_TIMEOUT_MS,
                exit_policy: ExitPolicy::FailOnError,
            }
        );
        assert_eq!(
            config.sweep_order(),
            vec![BusSpeed::FastPlus, BusSpeed::Standard]
        );
    }

    #[test]
    fn deserialize_rejects_unknown_keys() {
        assert!(from_str::<Config>("baud: 9600\n").is_err());
        assert!(from_str::<Config>("speeds: [turbo]\n").is_err());
    }

    #[test]
    fn command_line_overrides() {
        let config =
            Config::from_args(&args(&["-b", "3", "-s", "fast", "-t", "20", "--strict"])).unwrap();
        assert_eq!(config.bus, 3);
        assert_eq!(config.speeds, vec![BusSpeed::Fast]);
        assert_eq!(config.timeout_ms, 20);
        assert_eq!(config.exit_policy, ExitPolicy::FailOnError);
    }

    #[test]
    fn zero_timeout() {
        match Config::from_args(&args(&["-t", "0"])) {
            Err(ConfigError::ZeroTimeout) => {}
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn empty_speed_list() {
        let config: Config = from_str("speeds: []\n").unwrap();
        match config.validate() {
            Err(ConfigError::NoSpeeds) => {}
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_file() {
        match Config::from_args(&args(&["-c", "/nonexistent/i2cscan.yaml"])) {
            Err(ConfigError::IO { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/i2cscan.yaml"))
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn exit_codes() {
        let clean = RunSummary {
            completed: 3,
            ..RunSummary::default()
        };
        let failed = RunSummary {
            completed: 2,
            aborted: 1,
            ..RunSummary::default()
        };
        let interrupted = RunSummary {
            interrupted: true,
            ..RunSummary::default()
        };

        for summary in &[&clean, &failed, &interrupted] {
            assert_eq!(ExitPolicy::AlwaysZero.exit_code(summary), 0);
        }
        assert_eq!(ExitPolicy::FailOnError.exit_code(&clean), 0);
        assert_eq!(ExitPolicy::FailOnError.exit_code(&failed), 1);
        assert_eq!(ExitPolicy::FailOnError.exit_code(&interrupted), 130);
    }
}
