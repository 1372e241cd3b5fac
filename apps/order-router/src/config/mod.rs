//! Configuration module for the order router.
//!
//! Loads a YAML file, interpolates environment variables and validates the
//! result before anything is started.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_router::config::load_config;
//!
//! // Load from default path (config.yaml, or $ORDER_ROUTER_CONFIG)
//! let config = load_config(None)?;
//!
//! println!("dispatch pause: {}ms", config.dispatcher.pause_ms);
//! ```

mod dispatcher;
mod observability;
mod queue;
mod server;
mod venue;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dispatcher::{DispatcherConfig, ResolverConfig};
pub use observability::{LoggingConfig, MetricsSettings, ObservabilityConfig};
pub use queue::QueueConfig;
pub use server::ServerConfig;
pub use venue::{VenueConfig, VenueMode};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ORDER_ROUTER_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Venue configuration.
    #[serde(default)]
    pub venue: VenueConfig,
    /// Dispatch lane configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// Queue configuration.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Resolver pipeline configuration.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// The path defaults to `$ORDER_ROUTER_CONFIG`, then `config.yaml`.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(
        || std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.yaml".to_string()),
        str::to_string,
    );

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns the first rule that does not hold.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.http_port == config.server.metrics_port {
        return Err(ConfigError::ValidationError(
            "http_port and metrics_port must be different".to_string(),
        ));
    }

    if config.dispatcher.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.queue_capacity must be positive".to_string(),
        ));
    }

    if config.dispatcher.operation_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "dispatcher.operation_timeout_ms must be positive".to_string(),
        ));
    }

    if config.resolver.max_in_flight == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.max_in_flight must be positive".to_string(),
        ));
    }

    if config.queue.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "queue.poll_interval_ms must be positive".to_string(),
        ));
    }

    let Some(mode) = config.venue.mode() else {
        return Err(ConfigError::ValidationError(format!(
            "venue.mode must be one of: {:?}",
            VenueMode::ALLOWED
        )));
    };

    if mode != VenueMode::Paper {
        if config.venue.api_key.is_empty() || config.venue.api_secret.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "venue.api_key and venue.api_secret are required in {} mode",
                config.venue.mode
            )));
        }
        config.venue.to_binance_config()?;
    }

    let format = config.observability.logging.format.to_ascii_lowercase();
    if !LoggingConfig::FORMATS.contains(&format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {:?}",
            LoggingConfig::FORMATS
        )));
    }

    Ok(())
}
