// src/config.rs

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use dotenvy::dotenv;
use thiserror::Error;

const DEFAULT_CACHE_DIR: &str = "storage/app/purifier";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for the purifier definition cache. `None` runs uncached.
    pub cache_dir: Option<PathBuf>,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub rust_log: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    /// Reads the configuration after loading `.env`.
    ///
    /// Runs before logging is set up, so bad values are returned rather than
    /// logged.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let cache_dir = match env::var("HTML_FIELD_CACHE_DIR") {
            Ok(dir) if dir.trim().is_empty() => None,
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => Some(PathBuf::from(DEFAULT_CACHE_DIR)),
        };

        let bind_addr = parse_bind_addr(env::var("HTML_FIELD_BIND_ADDR").ok())?;

        let cors_origins = parse_origins(
            &env::var("HTML_FIELD_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        );

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            cache_dir,
            bind_addr,
            cors_origins,
            rust_log,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            bind_addr: default_bind_addr(),
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
            rust_log: "info".to_string(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn parse_bind_addr(raw: Option<String>) -> Result<SocketAddr, ConfigError> {
    match raw {
        None => Ok(default_bind_addr()),
        Some(addr) if addr.trim().is_empty() => Ok(default_bind_addr()),
        Some(addr) => addr.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "HTML_FIELD_BIND_ADDR",
            value: addr,
            reason: e.to_string(),
        }),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
