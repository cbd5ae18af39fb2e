//! Error types for the scanner controller
//!
//! Provides error handling for:
//! - Device-layer failures (enumeration, open, close)
//! - Host-facing scan errors, already classified
//! - Configuration validation
//! - Handles that outlive their controller

use serde::{Deserialize, Serialize};

/// Host-facing error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Enumeration returned zero devices
    NoCameraFound,
    /// Permission denied, device busy, security-restricted or over-constrained open
    CameraUnavailable,
    /// Releasing the device raised an error
    StopFailed,
    /// Routine "no symbol in frame" or malformed-symbol noise
    DecodeNoise,
    /// Permission/device/security error raised while decoding
    CriticalDecodeError,
    /// Decode failure that is neither noise nor critical
    DecodeFailure,
}

impl ErrorKind {
    /// Whether errors of this kind leave the controller in `Failed`
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoCameraFound | Self::CameraUnavailable | Self::CriticalDecodeError
        )
    }
}

/// Errors raised by a camera backend or decode session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// User or platform refused camera access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Requested device does not exist
    #[error("device not found: {0}")]
    NotFound(String),

    /// Device is held by another consumer
    #[error("device busy: {0}")]
    Busy(String),

    /// Access blocked by a security policy
    #[error("security restriction: {0}")]
    SecurityRestricted(String),

    /// Requested constraints cannot be satisfied by the device
    #[error("over-constrained request: {0}")]
    OverConstrained(String),

    /// The device or session has already been released
    #[error("device gone: {0}")]
    Gone(String),

    /// Any other I/O failure
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Errors delivered to the host
///
/// Raw device errors never reach the host; they are always wrapped in one of
/// these variants first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// No camera devices are available
    #[error("no cameras found")]
    NoCameraFound,

    /// The camera could not be enumerated or opened
    #[error("failed to start camera: {0}")]
    CameraUnavailable(DeviceError),

    /// The camera could not be released cleanly
    #[error("failed to stop scanner gracefully: {0}")]
    StopFailed(DeviceError),

    /// A permission or device error was raised mid-session
    #[error("camera access denied or no camera found ({0}); grant permission and ensure a camera is connected")]
    CriticalDecode(String),

    /// An unrecognised decode failure, reported but not fatal
    #[error("scan error: {0}")]
    DecodeFailure(String),
}

impl ScanError {
    /// Classification of this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCameraFound => ErrorKind::NoCameraFound,
            Self::CameraUnavailable(_) => ErrorKind::CameraUnavailable,
            Self::StopFailed(_) => ErrorKind::StopFailed,
            Self::CriticalDecode(_) => ErrorKind::CriticalDecodeError,
            Self::DecodeFailure(_) => ErrorKind::DecodeFailure,
        }
    }

    /// Whether the host should keep the message on screen until the user acts
    ///
    /// Permission and device errors usually need the user to grant access
    /// or connect a camera, so they are not auto-dismissed.
    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.kind().is_fatal()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field failed validation
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create a validation error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`ScannerHandle`](crate::ScannerHandle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// The controller task has exited
    #[error("scanner controller has shut down")]
    Closed,
}
