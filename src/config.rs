//! Application configuration
//!
//! Loaded from a TOML file, by default
//! `~/.config/field-booking/config.toml`. Every section and key is
//! optional; missing values take the defaults below.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! url = "sqlite://./field-booking.db?mode=rwc"
//!
//! [security]
//! jwt_secret = "change-me"
//!
//! [gateway]
//! tmn_code = "DEMO0001"
//! hash_secret = "..."
//! return_url = "https://api.example/api/v1/payments/vnpay/callback"
//! frontend_callback_url = "https://app.example/payment/result"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::{DatabaseConfig, VnPayConfig};
use crate::shared::errors::InfraError;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "FIELD_BOOKING_CONFIG";

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Attempts at drawing a free booking or transaction code
    pub code_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            code_attempts: crate::application::codes::DEFAULT_CODE_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: JwtConfig,
    pub logging: LoggingConfig,
    pub booking: BookingConfig,
    pub gateway: VnPayConfig,
}

impl AppConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot start with. Gateway settings are
    /// checked lazily, on the first payment that needs them.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.server.port == 0 {
            return Err(InfraError::Config("server.port must be non-zero".to_string()));
        }
        if self.database.url.trim().is_empty() {
            return Err(InfraError::Config("database.url must be set".to_string()));
        }
        if self.security.jwt_secret.trim().is_empty() {
            return Err(InfraError::Config(
                "security.jwt_secret must be set".to_string(),
            ));
        }
        if self.booking.code_attempts == 0 {
            return Err(InfraError::Config(
                "booking.code_attempts must be at least 1".to_string(),
            ));
        }
        self.gateway
            .expiry()
            .map_err(|e| InfraError::Config(e.to_string()))?;
        Ok(())
    }
}

/// `$FIELD_BOOKING_CONFIG` if set, else `<config dir>/field-booking/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("field-booking")
        .join("config.toml")
}
