//! # configs
//!
//! Layered settings for the forum binaries.
//!
//! Precedence, lowest first: built-in defaults, `config/forum.toml` (optional),
//! then `FORUM__`-prefixed environment variables with `__` between levels,
//! e.g. `FORUM__DATABASE__URL=sqlite:forum.db`. A `.env` file is read first.

use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// HS256 key shared with the external auth service.
    pub jwt_secret: SecretString,
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

fn default_leeway_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

/// Owner installed by the seed binary.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    pub owner_id: Uuid,
    pub owner_display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub auth: Option<AuthSettings>,
    pub log: LogSettings,
    #[serde(default)]
    pub seed: Option<SeedSettings>,
}

impl Settings {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let builder = Config::builder()
            .add_source(File::with_name("config/forum").required(false))
            .add_source(
                Environment::with_prefix("FORUM")
                    .prefix_separator("__")
                    .separator("__"),
            );
        Self::from_builder(builder)
    }

    /// Applies defaults underneath whatever sources `builder` already has.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder
            .set_default("database.url", "sqlite:forum.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("log.filter", "info")?
            .set_default("log.format", "pretty")?
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if let Some(auth) = &self.auth {
            if auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
                return Err(ConfigError::Invalid(format!(
                    "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
                )));
            }
        }
        if let Some(seed) = &self.seed {
            if seed.owner_display_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "seed.owner_display_name must not be blank".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn defaults_are_enough_to_start() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.database.url, "sqlite:forum.db");
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.database.acquire_timeout(), Duration::from_secs(5));
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(settings.auth.is_none());
        assert!(settings.seed.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [database]
            url = "sqlite::memory:"
            max_connections = 1

            [log]
            filter = "debug,sqlx=warn"
            format = "json"

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            "#,
        )
        .unwrap();
        assert_eq!(settings.database.url, "sqlite::memory:");
        assert_eq!(settings.database.max_connections, 1);
        assert_eq!(settings.log.format, LogFormat::Json);
        let auth = settings.auth.unwrap();
        assert_eq!(auth.leeway_secs, 30);
        assert_eq!(auth.jwt_secret.expose_secret().len(), 32);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let err = from_toml("[auth]\njwt_secret = \"short\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("jwt_secret")));
    }

    #[test]
    fn zero_connections_is_rejected() {
        let err = from_toml("[database]\nmax_connections = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn seed_section_parses_owner() {
        let id = Uuid::now_v7();
        let settings = from_toml(&format!(
            "[seed]\nowner_id = \"{id}\"\nowner_display_name = \"root\""
        ))
        .unwrap();
        let seed = settings.seed.unwrap();
        assert_eq!(seed.owner_id, id);
        assert_eq!(seed.owner_display_name, "root");
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let settings = from_toml("[auth]\njwt_secret = \"0123456789abcdef0123456789abcdef\"").unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("0123456789abcdef"));
    }
}
