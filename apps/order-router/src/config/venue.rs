//! Venue configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::infrastructure::venue::{BinanceConfig, BinanceEnvironment};

/// Which venue the router talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueMode {
    /// In-process simulated venue.
    Paper,
    /// Binance spot testnet.
    Testnet,
    /// Binance production.
    Production,
}

impl VenueMode {
    /// Allowed `venue.mode` values.
    pub const ALLOWED: [&'static str; 3] = ["paper", "testnet", "production"];

    fn parse(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "paper" => Some(Self::Paper),
            "testnet" => Some(Self::Testnet),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Venue configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// `paper`, `testnet` or `production`.
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Base URL override.
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret.
    #[serde(default, skip_serializing)]
    pub api_secret: String,
    /// `recvWindow` for signed requests, in milliseconds.
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// HTTP timeout, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Time in force for placed orders.
    #[serde(default = "default_time_in_force")]
    pub time_in_force: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            base_url: None,
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: default_recv_window_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            time_in_force: default_time_in_force(),
        }
    }
}

impl fmt::Debug for VenueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueConfig")
            .field("mode", &self.mode)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("recv_window_ms", &self.recv_window_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("time_in_force", &self.time_in_force)
            .finish()
    }
}

impl VenueConfig {
    /// Parsed mode, `None` if unknown.
    #[must_use]
    pub fn mode(&self) -> Option<VenueMode> {
        VenueMode::parse(&self.mode)
    }

    /// Binance adapter settings for the testnet and production modes.
    ///
    /// # Errors
    ///
    /// Returns a validation error in paper mode or when a value is invalid.
    pub fn to_binance_config(&self) -> Result<BinanceConfig, ConfigError> {
        let environment = match self.mode() {
            Some(VenueMode::Testnet) => BinanceEnvironment::Testnet,
            Some(VenueMode::Production) => BinanceEnvironment::Production,
            Some(VenueMode::Paper) | None => {
                return Err(ConfigError::ValidationError(format!(
                    "venue.mode {:?} has no Binance settings",
                    self.mode
                )));
            }
        };
        let time_in_force = self
            .time_in_force
            .parse()
            .map_err(ConfigError::ValidationError)?;

        let mut config = BinanceConfig::new(&self.api_key, &self.api_secret, environment)
            .with_recv_window(Duration::from_millis(self.recv_window_ms))
            .with_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_time_in_force(time_in_force);
        if let Some(base_url) = self.base_url.as_deref().filter(|u| !u.is_empty()) {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }
}

fn default_mode() -> String {
    "paper".to_string()
}

const fn default_recv_window_ms() -> u64 {
    5000
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_time_in_force() -> String {
    "GTC".to_string()
}
