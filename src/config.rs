//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub actor: ActorConfig,
    pub database: DatabaseConfig,
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

/// Server identity configuration
///
/// Only the public origin matters to this crate; bind address and port
/// belong to the embedding HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Public domain (e.g., "photos.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://photos.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// The single published actor
#[derive(Debug, Clone, Deserialize)]
pub struct ActorConfig {
    /// Stable handle (e.g., "gallery")
    pub handle: String,
    /// Display name shown in the actor document
    pub display_name: String,
    /// Profile summary
    #[serde(default)]
    pub summary: Option<String>,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Outbound delivery tuning
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum concurrent inbox deliveries
    pub max_concurrent: usize,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info")
    pub level: String,
    /// Output format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (LENSPUB_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.protocol", "https")?
            .set_default("database.path", "lenspub.db")?
            .set_default("delivery.max_concurrent", 10)?
            .set_default("delivery.timeout_seconds", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("LENSPUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.server.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "server.domain must not be empty".to_string(),
            ));
        }
        if !matches!(self.server.protocol.as_str(), "http" | "https") {
            return Err(crate::error::AppError::Config(format!(
                "server.protocol must be http or https, got {}",
                self.server.protocol
            )));
        }
        if self.actor.handle.trim().is_empty() || self.actor.handle.contains('/') {
            return Err(crate::error::AppError::Config(
                "actor.handle must be a non-empty path segment".to_string(),
            ));
        }
        if self.delivery.max_concurrent == 0 {
            return Err(crate::error::AppError::Config(
                "delivery.max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Initialize tracing from logging configuration.
///
/// Called once by the embedding binary before constructing the core.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lenspub={}", logging.level).into());

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                domain: "photos.example.com".to_string(),
                protocol: "https".to_string(),
            },
            actor: ActorConfig {
                handle: "gallery".to_string(),
                display_name: "Gallery".to_string(),
                summary: None,
            },
            database: DatabaseConfig {
                path: "lenspub.db".into(),
            },
            delivery: DeliveryConfig {
                max_concurrent: 10,
                timeout_seconds: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn base_url_joins_protocol_and_domain() {
        let config = base_config();
        assert_eq!(config.server.base_url(), "https://photos.example.com");
    }

    #[test]
    fn validate_rejects_unknown_protocol() {
        let mut config = base_config();
        config.server.protocol = "gopher".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_handle_with_path_separator() {
        let mut config = base_config();
        config.actor.handle = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_delivery_concurrency() {
        let mut config = base_config();
        config.delivery.max_concurrent = 0;
        assert!(config.validate().is_err());
    }
}
