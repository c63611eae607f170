use crate::utils::error::Result;
use crate::utils::validation::{
    parse_var, require_var, validate_non_empty_string, validate_positive_number, validate_range,
    validate_url, Validate,
};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub const RPC_HOST: &str = "CONFIG_RPC_HOST";
pub const RPC_PORT: &str = "CONFIG_RPC_PORT";
pub const RPC_USERNAME: &str = "CONFIG_RPC_USERNAME";
pub const RPC_PASSWORD: &str = "CONFIG_RPC_PASSWORD";
pub const TITLE_API_URL: &str = "TITLE_API_URL";
pub const API_BIND_ADDR: &str = "API_BIND_ADDR";
pub const REGISTRY_TIMEOUT_SECS: &str = "REGISTRY_TIMEOUT_SECS";
pub const FEED_CHANNEL_CAPACITY: &str = "FEED_CHANNEL_CAPACITY";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 15;
const DEFAULT_FEED_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct LedgerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub feed_capacity: usize,
}

impl LedgerConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("feed_capacity", &self.feed_capacity)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

/// Built once at start and shared with the query server and the subscriber.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub registry: RegistryConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Fails on the first required variable that is not set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = require_var(&lookup, RPC_HOST)?;
        let port = parse_var::<u16>(RPC_PORT, &require_var(&lookup, RPC_PORT)?)?;
        let username = require_var(&lookup, RPC_USERNAME)?;
        let password = require_var(&lookup, RPC_PASSWORD)?;
        let registry_url = require_var(&lookup, TITLE_API_URL)?;

        let bind_addr = lookup(API_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let timeout_secs = match lookup(REGISTRY_TIMEOUT_SECS) {
            Some(raw) => parse_var::<u64>(REGISTRY_TIMEOUT_SECS, &raw)?,
            None => DEFAULT_REGISTRY_TIMEOUT_SECS,
        };
        validate_range(REGISTRY_TIMEOUT_SECS, timeout_secs, 1, 300)?;
        let feed_capacity = match lookup(FEED_CHANNEL_CAPACITY) {
            Some(raw) => parse_var::<usize>(FEED_CHANNEL_CAPACITY, &raw)?,
            None => DEFAULT_FEED_CAPACITY,
        };

        Ok(Self {
            ledger: LedgerConfig {
                host,
                port,
                username,
                password,
                feed_capacity,
            },
            registry: RegistryConfig {
                base_url: registry_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            server: ServerConfig {
                bind_addr: parse_var(API_BIND_ADDR, &bind_addr)?,
            },
        })
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string(RPC_HOST, &self.ledger.host)?;
        validate_range(RPC_PORT, self.ledger.port, 1, u16::MAX)?;
        validate_non_empty_string(RPC_USERNAME, &self.ledger.username)?;
        validate_positive_number(FEED_CHANNEL_CAPACITY, self.ledger.feed_capacity, 1)?;
        validate_url(TITLE_API_URL, &self.registry.base_url)?;
        validate_range(
            REGISTRY_TIMEOUT_SECS,
            self.registry.timeout.as_secs(),
            1,
            300,
        )?;

        tracing::info!("Configuration validation passed");
        Ok(())
    }
}
