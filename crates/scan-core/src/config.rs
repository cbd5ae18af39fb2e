//! Scanner configuration
//!
//! Defines:
//! - Cooldown and restart timing
//! - Supported symbol formats
//! - Decode rate and viewport hints passed to the device

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Barcode/QR symbol formats the decoder can be asked to recognise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolFormat {
    /// QR code (2-D matrix)
    QrCode,
    /// Code 128 (1-D)
    #[serde(rename = "CODE_128")]
    Code128,
    /// EAN-13 (1-D)
    #[serde(rename = "EAN_13")]
    Ean13,
    /// EAN-8 (1-D)
    #[serde(rename = "EAN_8")]
    Ean8,
    /// Interleaved 2 of 5 (1-D)
    Itf,
    /// Data Matrix (2-D)
    DataMatrix,
    /// Aztec (2-D)
    Aztec,
    /// PDF417 (stacked 1-D)
    #[serde(rename = "PDF_417")]
    Pdf417,
}

impl SymbolFormat {
    /// Every format enabled by default
    pub const DEFAULTS: [SymbolFormat; 8] = [
        Self::QrCode,
        Self::Code128,
        Self::Ean13,
        Self::Ean8,
        Self::Itf,
        Self::DataMatrix,
        Self::Aztec,
        Self::Pdf417,
    ];

    /// Two-dimensional symbology
    #[inline]
    #[must_use]
    pub fn is_two_dimensional(&self) -> bool {
        matches!(self, Self::QrCode | Self::DataMatrix | Self::Aztec)
    }
}

/// Bounding box hint for the decode viewport, in logical units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSize {
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Default for RegionSize {
    fn default() -> Self {
        Self {
            width: 250,
            height: 250,
        }
    }
}

/// Scanner controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Window after a successful decode during which further decodes are ignored
    pub cooldown_duration_ms: u64,
    /// Formats the decoder should recognise
    pub supported_symbol_formats: Vec<SymbolFormat>,
    /// Decode attempt rate
    pub frames_per_second: u32,
    /// Viewport hint
    pub decode_region_size: RegionSize,
    /// Prefer the last successfully opened camera on the next start
    pub remember_last_camera: bool,
    /// Skip mirrored-frame decode attempts
    pub disable_flip: bool,
    /// Pause between closing and reopening the camera on restart
    pub restart_delay_ms: u64,
}

impl ScannerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cooldown duration
    #[inline]
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_duration_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With supported formats
    #[inline]
    #[must_use]
    pub fn with_formats(mut self, formats: impl Into<Vec<SymbolFormat>>) -> Self {
        self.supported_symbol_formats = formats.into();
        self
    }

    /// With decode rate
    #[inline]
    #[must_use]
    pub fn with_frames_per_second(mut self, fps: u32) -> Self {
        self.frames_per_second = fps;
        self
    }

    /// With restart settle delay
    #[inline]
    #[must_use]
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With remembered-camera preference
    #[inline]
    #[must_use]
    pub fn with_remember_last_camera(mut self, remember: bool) -> Self {
        self.remember_last_camera = remember;
        self
    }

    /// Cooldown as a duration
    #[inline]
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_duration_ms)
    }

    /// Restart delay as a duration
    #[inline]
    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Settings handed to the device on open
    #[must_use]
    pub fn decode_config(&self) -> DecodeConfig {
        DecodeConfig {
            frames_per_second: self.frames_per_second,
            region: self.decode_region_size,
            formats: self.supported_symbol_formats.clone(),
            disable_flip: self.disable_flip,
        }
    }

    /// Check field ranges
    ///
    /// # Errors
    /// - `ConfigError::Invalid` for a zero decode rate, an empty decode
    ///   region or an empty format list
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_per_second == 0 {
            return Err(ConfigError::invalid("frames_per_second", "must be at least 1"));
        }
        if self.decode_region_size.width == 0 || self.decode_region_size.height == 0 {
            return Err(ConfigError::invalid(
                "decode_region_size",
                format!(
                    "{}x{} has a zero dimension",
                    self.decode_region_size.width, self.decode_region_size.height
                ),
            ));
        }
        if self.supported_symbol_formats.is_empty() {
            return Err(ConfigError::invalid(
                "supported_symbol_formats",
                "at least one format is required",
            ));
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            cooldown_duration_ms: 500,
            supported_symbol_formats: SymbolFormat::DEFAULTS.to_vec(),
            frames_per_second: 10,
            decode_region_size: RegionSize::default(),
            remember_last_camera: false,
            disable_flip: false,
            restart_delay_ms: 0,
        }
    }
}

/// Per-session decode settings passed to [`CameraBackend::open`](crate::CameraBackend::open)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Decode attempts per second
    pub frames_per_second: u32,
    /// Viewport hint
    pub region: RegionSize,
    /// Formats to recognise
    pub formats: Vec<SymbolFormat>,
    /// Skip mirrored-frame attempts
    pub disable_flip: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_kiosk_settings() {
        let config = ScannerConfig::default();
        assert_eq!(config.cooldown(), Duration::from_millis(500));
        assert_eq!(config.frames_per_second, 10);
        assert_eq!(config.decode_region_size, RegionSize { width: 250, height: 250 });
        assert!(!config.remember_last_camera);
        assert_eq!(config.restart_delay(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_cover_matrix_and_linear_formats() {
        let formats = ScannerConfig::default().supported_symbol_formats;
        assert!(formats.iter().any(SymbolFormat::is_two_dimensional));
        assert!(formats.iter().filter(|f| !f.is_two_dimensional()).count() >= 3);
    }

    #[test]
    fn rejects_zero_fps() {
        let err = ScannerConfig::new().with_frames_per_second(0).validate().unwrap_err();
        assert!(err.to_string().contains("frames_per_second"));
    }

    #[test]
    fn rejects_empty_region() {
        let mut config = ScannerConfig::new();
        config.decode_region_size.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_formats() {
        let config = ScannerConfig::new().with_formats(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_sets_durations() {
        let config = ScannerConfig::new()
            .with_cooldown(Duration::from_secs(2))
            .with_restart_delay(Duration::from_millis(200));
        assert_eq!(config.cooldown_duration_ms, 2000);
        assert_eq!(config.restart_delay_ms, 200);
    }

    #[test]
    fn decode_config_carries_device_settings() {
        let config = ScannerConfig::new().with_formats([SymbolFormat::QrCode]);
        let decode = config.decode_config();
        assert_eq!(decode.formats, vec![SymbolFormat::QrCode]);
        assert_eq!(decode.frames_per_second, 10);
        assert!(!decode.disable_flip);
    }
}
