// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
#[error("invalid value '{value}' for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    /// Policy used for parameter trees and for requests that name none.
    pub default_policy: String,
    /// Preserve `<r:... />` template tags when sanitizing parameters.
    pub template_tags: bool,
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rust_log: "info".to_string(),
            default_policy: "default".to_string(),
            template_tags: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let bind_addr = parse_var("BIND_ADDR", DEFAULT_BIND_ADDR)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let default_policy =
            env::var("SANITIZE_DEFAULT_POLICY").unwrap_or_else(|_| "default".to_string());

        let template_tags = parse_var("SANITIZE_TEMPLATE_TAGS", "false")?;

        let max_body_bytes = parse_var("MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string())?;

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|origins| split_origins(&origins))
            .unwrap_or_default();

        Ok(Self {
            bind_addr,
            rust_log,
            default_policy,
            template_tags,
            max_body_bytes,
            cors_origins,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.trim().parse().map_err(|_| ConfigError { key, value })
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            split_origins(" http://localhost:3000, ,http://127.0.0.1:3000 "),
            vec!["http://localhost:3000", "http://127.0.0.1:3000"]
        );
        assert!(split_origins("").is_empty());
    }

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.default_policy, "default");
        assert!(!config.template_tags);
        assert_eq!(config.max_body_bytes, 1024 * 1024);
    }
}
