use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::evaluation::{EnvFallback, EvaluationOptions};
use crate::service::ServiceSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub cache_timeout: Duration,
    pub store_timeout: Duration,
    pub env_fallback: EnvFallback,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: required("PORT")?,
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: optional("DATABASE_MAX_CONNECTIONS", 10)?,
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            cache_ttl: Duration::from_secs(optional("CACHE_TTL_SECONDS", 60)?),
            cache_timeout: Duration::from_millis(optional("CACHE_TIMEOUT_MS", 250)?),
            store_timeout: Duration::from_millis(optional("STORE_TIMEOUT_MS", 5000)?),
            env_fallback: optional("ENV_MISSING_FALLBACK", EnvFallback::FirstEnv)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            cache_ttl: self.cache_ttl,
            cache_timeout: self.cache_timeout,
            evaluation: EvaluationOptions {
                env_fallback: self.env_fallback,
            },
        }
    }
}

fn required<T>(name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    parse(name, &raw)
}

fn optional<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
