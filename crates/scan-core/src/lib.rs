//! Scan Core - camera scanning lifecycle controller
//!
//! Owns a camera-based decode session on behalf of a host:
//! - Starts and stops the camera as the host's desired state changes
//! - Suppresses duplicate decodes with a cooldown, then restarts the camera
//! - Filters routine decode noise and surfaces permission/device errors
//!
//! # Example
//!
//! ```rust,ignore
//! use scan_core::{ScannerConfig, ScannerController, ScannerEvent};
//!
//! # async fn example(backend: impl scan_core::CameraBackend + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! let (handle, mut events) = ScannerController::spawn(backend, ScannerConfig::new())?;
//! handle.set_desired_active(true)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ScannerEvent::Decoded(text) => println!("scanned {text}"),
//!         ScannerEvent::Error(err) => eprintln!("{err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod classify;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod handle;
pub mod state;

// Re-exports for convenience
pub use classify::classify_decode_failure;
pub use config::{DecodeConfig, RegionSize, ScannerConfig, SymbolFormat};
pub use controller::ScannerController;
pub use device::{
    CameraBackend, CameraInfo, DecodeResult, DecodeSession, DecodeSink, DeviceEvent, SessionHandle,
    SessionId,
};
pub use error::{ConfigError, ControllerError, DeviceError, ErrorKind, ScanError};
pub use handle::{ScannerEvent, ScannerEvents, ScannerHandle, ScannerSnapshot, ScannerStats};
pub use state::{IllegalTransition, ScannerStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosting a scanner
    pub use crate::{
        CameraBackend, ScanError, ScannerConfig, ScannerController, ScannerEvent, ScannerEvents,
        ScannerHandle, ScannerStatus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
