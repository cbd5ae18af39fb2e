//! Scan Kiosk - attendance check-in from scanned member codes
//!
//! Hosts a [`scan_core`] scanner controller:
//! - Reads codes from line sources (stdin, files, serial streams)
//! - Records check-in/check-out with the attendance service
//! - Reports scanner problems to the person at the kiosk

#![warn(unreachable_pub)]

pub mod attendance;
pub mod config;
pub mod error;
pub mod input;
pub mod kiosk;

pub use attendance::{describe_failure, parse_member_id, AttendanceApi, AttendanceRecord, HttpAttendanceClient};
pub use config::{KioskConfig, TOKEN_ENV};
pub use error::{KioskError, Result};
pub use input::{LineInputBackend, BLANK_LINE_MESSAGE, STDIN_SOURCE};
pub use kiosk::{Kiosk, KioskSummary, Notice, ScanOutcome, ScannedMember};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
