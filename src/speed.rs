//! Clock speeds an I2C bus can be swept at.
//!
//! Parses from `standard`, `fast` and `fast_plus` as well as the shorthand
//! forms `100k`, `400k` and `1m`.

use serde::Deserialize;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Bus clock speed. Ordered by frequency, slowest first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusSpeed {
    /// 100 kHz "standard mode".
    #[serde(alias = "100k")]
    Standard,
    /// 400 kHz "fast mode".
    #[serde(alias = "400k")]
    Fast,
    /// 1 MHz "fast mode plus".
    #[serde(alias = "1m")]
    FastPlus,
}

impl BusSpeed {
    pub const ALL: [BusSpeed; 3] = [BusSpeed::FastPlus, BusSpeed::Fast, BusSpeed::Standard];

    pub fn hz(self) -> u32 {
        match self {
            BusSpeed::Standard => 100_000,
            BusSpeed::Fast => 400_000,
            BusSpeed::FastPlus => 1_000_000,
        }
    }

    /// Sorts the given speeds fastest first and drops duplicates.
    pub fn sweep_order(speeds: &[BusSpeed]) -> Vec<BusSpeed> {
        let mut order = speeds.to_vec();
        order.sort_unstable_by(|a, b| b.cmp(a));
        order.dedup();
        order
    }
}

impl Display for BusSpeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BusSpeed::Standard => write!(f, "100 kHz"),
            BusSpeed::Fast => write!(f, "400 kHz"),
            BusSpeed::FastPlus => write!(f, "1 MHz"),
        }
    }
}

impl FromStr for BusSpeed {
    type Err = ParseSpeedError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        match source.trim().to_ascii_lowercase().as_str() {
            "standard" | "100k" => Ok(BusSpeed::Standard),
            "fast" | "400k" => Ok(BusSpeed::Fast),
            "fast_plus" | "fast-plus" | "1m" => Ok(BusSpeed::FastPlus),
            "" => Err(ParseSpeedError::Blank),
            _ => Err(ParseSpeedError::Unknown {
                offending_input: source.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseSpeedError {
    #[error("Could not parse `{offending_input}` as a bus speed, expected one of standard, fast, fast_plus, 100k, 400k or 1m")]
    Unknown { offending_input: String },
    #[error("Could not parse blank string as a bus speed")]
    Blank,
}
