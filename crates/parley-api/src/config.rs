use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use parley_db::PoolOptions;
use thiserror::Error;

pub const JWT_SECRET_VAR: &str = "PARLEY_JWT_SECRET";

/// Known placeholder or fallback secrets that must never sign tokens.
pub const PLACEHOLDER_SECRETS: &[&str] = &[
    "default-secret-key",
    "None",
    "dev-secret-change-me",
    "change-me-to-a-random-string",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is not set (or is blank).
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("{0} is still set to a placeholder value; configure a real secret")]
    PlaceholderSecret(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Resolves the token-signing secret. There is no fallback: an unset, blank or
/// placeholder secret is an error.
pub fn resolve_secret(raw: Option<&str>) -> Result<String, ConfigError> {
    let secret = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingEnvVar(JWT_SECRET_VAR))?;

    if PLACEHOLDER_SECRETS.contains(&secret) {
        return Err(ConfigError::PlaceholderSecret(JWT_SECRET_VAR));
    }

    Ok(secret.to_string())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub pool: PoolOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = resolve_secret(lookup(JWT_SECRET_VAR).as_deref())?;

        let database_path = lookup("PARLEY_DATABASE_PATH")
            .unwrap_or_else(|| "parley.db".into())
            .into();
        let host = lookup("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_var(&lookup, "PARLEY_PORT", 3000)?;
        let max_size = parse_var(&lookup, "PARLEY_DB_POOL_SIZE", 8u32)?;
        let timeout_secs = parse_var(&lookup, "PARLEY_DB_TIMEOUT_SECS", 5u64)?;

        if max_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "PARLEY_DB_POOL_SIZE",
                value: "0".into(),
            });
        }

        Ok(Self {
            jwt_secret,
            database_path,
            host,
            port,
            pool: PoolOptions {
                max_size,
                connection_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}
