use std::env;
use std::net::SocketAddr;

use thiserror::Error;

pub const STORE_URL_VAR: &str = "BOOKSTORE_API_URL";
pub const BIND_ADDR_VAR: &str = "BOOKSTORE_BIND_ADDR";

const DEFAULT_STORE_URL: &str = "http://localhost:3000";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5173";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be an http:// or https:// URL, got {value:?}")]
    InvalidStoreUrl { var: &'static str, value: String },

    #[error("{var} must be a socket address such as 127.0.0.1:5173, got {value:?}")]
    InvalidBindAddr { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the external book store.
    pub store_url: String,
    pub bind_addr: SocketAddr,
}

impl Settings {
    /// Read settings from the process environment. Call `dotenvy::dotenv()`
    /// first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Settings::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_url = lookup(STORE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let store_url = store_url.trim().trim_end_matches('/').to_string();
        if !store_url.starts_with("http://") && !store_url.starts_with("https://") {
            return Err(ConfigError::InvalidStoreUrl {
                var: STORE_URL_VAR,
                value: store_url,
            });
        }

        let bind_addr = lookup(BIND_ADDR_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr {
                var: BIND_ADDR_VAR,
                value: bind_addr.clone(),
            })?;

        Ok(Settings {
            store_url,
            bind_addr,
        })
    }
}
