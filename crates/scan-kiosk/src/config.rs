//! Kiosk configuration
//!
//! Loaded from TOML; every field has a default so a partial file is enough.
//!
//! ```toml
//! api_base_url = "http://gym.local:8088/api"
//! inputs = ["/dev/ttyACM0", "-"]
//!
//! [scanner]
//! cooldown_duration_ms = 1500
//! ```

use crate::error::{KioskError, Result};
use scan_core::{ConfigError, ScannerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable supplying the API token when the file has none
pub const TOKEN_ENV: &str = "SCAN_KIOSK_API_TOKEN";

/// Kiosk configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Base URL of the attendance REST API, without a trailing slash
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    /// Line sources to scan from, in preference order; `-` is stdin
    pub inputs: Vec<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Scanner controller settings
    pub scanner: ScannerConfig,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8088/api".to_string(),
            api_token: None,
            inputs: vec!["-".to_string()],
            request_timeout_secs: 10,
            scanner: ScannerConfig::default(),
        }
    }
}

impl KioskConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `KioskError::ConfigRead` if the file cannot be read
    /// - `KioskError::ConfigParse` if it is not valid TOML
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| KioskError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// - `KioskError::ConfigParse` if it is not valid TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the API base URL
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the bearer token
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Replace the input sources
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the scanner cooldown
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.scanner = self.scanner.with_cooldown(cooldown);
        self
    }

    /// Fill in the token from `env_token` when none is configured
    #[must_use]
    pub fn with_fallback_token(mut self, env_token: Option<String>) -> Self {
        if self.api_token.is_none() {
            self.api_token = env_token.filter(|t| !t.trim().is_empty());
        }
        self
    }

    /// Fill in the token from [`TOKEN_ENV`] when none is configured
    #[must_use]
    pub fn with_env_token(self) -> Self {
        self.with_fallback_token(std::env::var(TOKEN_ENV).ok())
    }

    /// Per-request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check field ranges, including the scanner table
    ///
    /// # Errors
    /// - `KioskError::Config` naming the first offending field
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid("api_base_url", format!("'{url}' is not an http(s) URL")).into());
        }
        if self.inputs.is_empty() || self.inputs.iter().any(|i| i.trim().is_empty()) {
            return Err(ConfigError::invalid("inputs", "at least one non-empty input is required").into());
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be at least 1").into());
        }
        self.scanner.validate()?;
        Ok(())
    }
}
