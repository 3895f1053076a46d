//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `ACTON_CQRS_`, nested keys split on `__`)
//! 2. `config.toml` in the working directory, or the path given to [`Config::load_from`]
//! 3. Default values
//!
//! ```toml
//! [service]
//! name = "products-api"
//! log_level = "debug"
//!
//! [endpoints]
//! public_base_url = "https://api.example.com"
//! ```
//!
//! `ACTON_CQRS_ENDPOINTS__PUBLIC_BASE_URL=https://api.example.com` sets the
//! same base URL from the environment.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_CQRS_";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Endpoint binding configuration
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level or `EnvFilter` directive, e.g. `info,acton_cqrs=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

/// Endpoint binding configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Scheme and host prefixed to `Location` headers
    ///
    /// Unset means relative locations such as `/products/42`.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_name() -> String {
    "acton-cqrs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Config {
    /// Load configuration from `./config.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
        }

        let config = Self::figment(path).extract()?;
        Ok(config)
    }

    /// The provider chain behind [`load_from`](Self::load_from)
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Load from config file (if exists)
            .merge(Toml::file(path.as_ref()))
            // Override with environment variables
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// True when `service.environment` is `production`
    pub fn is_production(&self) -> bool {
        self.service.environment == "production"
    }
}
