use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub mod cors;

pub use cors::create_cors_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SWEEP_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub completion_sweep: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sweep_secs: u64 = parse_or(&lookup, "COMPLETION_SWEEP_SECS", DEFAULT_SWEEP_SECS)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "COMPLETION_SWEEP_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            host: parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            completion_sweep: Duration::from_secs(sweep_secs),
            cors_origins: cors::parse_origins(
                &lookup("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| cors::DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
    }
}
