//! Kiosk error types

use std::path::PathBuf;

/// Result type for kiosk operations
pub type Result<T> = std::result::Result<T, KioskError>;

/// Errors raised while turning a scan into an attendance record
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    /// Scanned text does not start with a member id
    #[error("Invalid QR Code: Scanned value '{0}' is not a valid User ID.")]
    InvalidMemberId(String),

    /// The attendance service rejected the request; the message is shown verbatim
    #[error("{0}")]
    Attendance(String),

    /// Transport-level HTTP failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`KioskConfig`](crate::KioskConfig)
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration values failed validation
    #[error(transparent)]
    Config(#[from] scan_core::ConfigError),
}

impl KioskError {
    /// Whether the error came from the scanned value itself rather than the service
    #[inline]
    #[must_use]
    pub fn is_invalid_scan(&self) -> bool {
        matches!(self, Self::InvalidMemberId(_))
    }
}
