//! # vr-config
//!
//! Layered configuration for the venue-reserve binary. Later sources win:
//! built-in defaults, then an optional `venue-reserve.toml`, then `VR__`
//! environment variables (`VR__DATABASE__URL`, `VR__HTTP__PORT`, ...).
//! A `.env` file, if present, can be loaded into the environment first with
//! [`load_env_file`].

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

pub const DEFAULT_FILE: &str = "venue-reserve.toml";
pub const ENV_PREFIX: &str = "VR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete engine configuration.
#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
}

/// Shared durable store.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL; may carry credentials for other backends.
    pub url: SecretString,
    /// Maximum number of pooled connections
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info,sqlx=warn`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Loads `path`, or the nearest `.env` when `None`, into the process
/// environment. Returns the file that was read.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

impl EngineConfig {
    /// Reads `venue-reserve.toml` and the process environment. Call
    /// [`load_env_file`] first to pick up a `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(
            Path::new(DEFAULT_FILE),
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    /// Builds from an explicit file path and environment source.
    pub fn from_sources(file: &Path, env: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("database.url", "sqlite:venue_reserve.db")?
            .set_default("database.max_connections", 5)?
            .set_default("http.host", "127.0.0.1")?
            .set_default("http.port", 8080)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?
            .add_source(File::from(file).required(false))
            .add_source(env)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.http.host.trim().is_empty() {
            return Err(ConfigError::Invalid("http.host must not be empty".to_string()));
        }
        Ok(())
    }
}
