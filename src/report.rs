//! Text rendering of scan results.
//!
//! The grid has one row per group of sixteen addresses, each cell is three
//! characters wide. Addresses that got no transaction, like the general
//! call address, are left blank:
//!
//! ```text
//! ---- I2C Scan at 400 kHz
//!      00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F
//! 0x00    .. .. .. .. .. .. .. .. .. .. .. .. .. .. ..
//! 0x10 .. .. .. .. .. .. .. .. .. .. .. .. .. .. .. ..
//! ...
//! 0x40 .. .. [] .. .. .. .. .. .. .. .. .. .. .. .. ..
//! ...
//!
//!  *** I2C devices detected at: 0x42
//! ```

use crate::{
    address::DeviceAddress,
    scan::{Presence, ScanResult},
    speed::BusSpeed,
};

const DETECTED: &str = "[] ";
const NOT_DETECTED: &str = ".. ";
const NOT_PROBED: &str = "   ";
const ROW_LABEL_WIDTH: usize = 5;

pub fn speed_header(speed: BusSpeed) -> String {
    format!("---- I2C Scan at {}", speed)
}

pub fn column_header() -> String {
    let mut line = " ".repeat(ROW_LABEL_WIDTH);
    for low in 0x0..=0xF_u8 {
        line.push_str(&format!("0{:01X} ", low));
    }
    line.trim_end().to_string()
}

/// Renders the row starting at `high`, which is rounded down to a multiple
/// of sixteen.
pub fn row(result: &ScanResult, high: u8) -> String {
    let high = high & 0x70;
    let mut line = format!("0x{:02X} ", high);
    for low in 0x0..=0xF_u8 {
        if let Ok(address) = DeviceAddress::try_from(high | low) {
            line.push_str(cell(result, address));
        }
    }
    line.trim_end().to_string()
}

fn cell(result: &ScanResult, address: DeviceAddress) -> &'static str {
    if !result.was_probed(address) {
        return NOT_PROBED;
    }
    match result.get(address) {
        Presence::Present => DETECTED,
        Presence::Absent => NOT_DETECTED,
    }
}

pub fn summary(result: &ScanResult) -> String {
    if !result.is_complete() {
        return " *** I2C scan aborted, no addresses probed".to_string();
    }

    let present: Vec<String> = result.present().map(|a| a.to_string()).collect();
    if present.is_empty() {
        " *** I2C devices detected at: NO DEVICES DETECTED".to_string()
    } else {
        format!(" *** I2C devices detected at: {}", present.join(" "))
    }
}

/// The full report of a pass, as written during the sweep.
pub fn render(result: &ScanResult) -> String {
    let mut lines = vec![speed_header(result.speed())];
    if result.is_complete() {
        lines.push(column_header());
        for high in (0x00..0x80_u8).step_by(0x10) {
            lines.push(row(result, high));
        }
        lines.push(String::new());
    }
    lines.push(summary(result));
    lines.push(String::new());

    let mut report = lines.join("\n");
    report.push('\n');
    report
}
