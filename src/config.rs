//! Run configuration
//!
//! Built once in `main` from the environment (plus an optional `.env`) and
//! passed by reference. Only the sender's key is required; everything else has
//! a testnet default.

use std::env;
use std::fmt;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;

use crate::constants::{
    DEFAULT_DESTINATION_RPC_URL, DEFAULT_SOURCE_RPC_URL, DEFAULT_STATUS_API_URL,
    DESTINATION_DOMAIN_ID, MAX_FEE, RESOURCE_ID, TARGET_CONTRACT_ADDRESS,
    TARGET_FUNCTION_SELECTOR,
};
use crate::error::ConfigError;
use crate::types::TransferRequest;
use crate::watcher::WatchConfig;

#[derive(Clone)]
pub struct Config {
    /// Key the bridging transaction is signed with
    pub private_key: String,

    /// Source chain RPC URL
    pub source_rpc_url: String,
    /// Destination chain RPC URL
    pub destination_rpc_url: String,
    /// Bridge status indexer base URL
    pub status_api_url: String,

    /// Sleep before each destination read in milliseconds
    pub watch_poll_interval_ms: u64,
    /// Unchanged destination reads tolerated before giving up
    pub watch_max_attempts: u32,
    /// Failed destination reads tolerated over the whole watch
    pub watch_max_read_errors: u32,

    /// Status query cadence in milliseconds
    pub status_poll_interval_ms: u64,

    /// Overall deadline for both pollers in milliseconds
    pub run_timeout_ms: u64,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("private_key", &"<redacted>")
            .field("source_rpc_url", &self.source_rpc_url)
            .field("destination_rpc_url", &self.destination_rpc_url)
            .field("status_api_url", &self.status_api_url)
            .field("watch_poll_interval_ms", &self.watch_poll_interval_ms)
            .field("watch_max_attempts", &self.watch_max_attempts)
            .field("watch_max_read_errors", &self.watch_max_read_errors)
            .field("status_poll_interval_ms", &self.status_poll_interval_ms)
            .field("run_timeout_ms", &self.run_timeout_ms)
            .finish()
    }
}

fn default_watch_poll_interval() -> u64 {
    15_000
}

fn default_watch_max_attempts() -> u32 {
    8
}

fn default_watch_max_read_errors() -> u32 {
    3
}

fn default_status_poll_interval() -> u64 {
    5_000
}

fn default_run_timeout() -> u64 {
    30 * 60 * 1000
}

impl Config {
    /// Load configuration from environment, reading `.env` first if present
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded .env from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let private_key = get("PRIVATE_KEY").ok_or(ConfigError::Missing("PRIVATE_KEY"))?;

        let config = Self {
            private_key,
            source_rpc_url: get("SOURCE_EVM_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_RPC_URL.to_string()),
            destination_rpc_url: get("DESTINATION_EVM_URL")
                .unwrap_or_else(|| DEFAULT_DESTINATION_RPC_URL.to_string()),
            status_api_url: get("STATUS_API_URL")
                .unwrap_or_else(|| DEFAULT_STATUS_API_URL.to_string()),
            watch_poll_interval_ms: parse_or(
                get("WATCH_POLL_INTERVAL_MS"),
                "WATCH_POLL_INTERVAL_MS",
                default_watch_poll_interval(),
            )?,
            watch_max_attempts: parse_or(
                get("WATCH_MAX_ATTEMPTS"),
                "WATCH_MAX_ATTEMPTS",
                default_watch_max_attempts(),
            )?,
            watch_max_read_errors: parse_or(
                get("WATCH_MAX_READ_ERRORS"),
                "WATCH_MAX_READ_ERRORS",
                default_watch_max_read_errors(),
            )?,
            status_poll_interval_ms: parse_or(
                get("STATUS_POLL_INTERVAL_MS"),
                "STATUS_POLL_INTERVAL_MS",
                default_status_poll_interval(),
            )?,
            run_timeout_ms: parse_or(get("RUN_TIMEOUT_MS"), "RUN_TIMEOUT_MS", default_run_timeout())?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.signer()?;

        if self.watch_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "WATCH_POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.status_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "STATUS_POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Signer for the configured key
    pub fn signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        self.private_key
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "PRIVATE_KEY",
                reason: "not a 32-byte hex private key".to_string(),
            })
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_millis(self.watch_poll_interval_ms),
            max_attempts: self.watch_max_attempts,
            max_read_errors: self.watch_max_read_errors,
        }
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    /// The bridged call this tool makes, sent from the configured key
    pub fn transfer_request(&self) -> Result<TransferRequest, ConfigError> {
        Ok(TransferRequest {
            sender: self.signer()?.address(),
            destination_domain_id: DESTINATION_DOMAIN_ID,
            resource_id: RESOURCE_ID,
            target_contract: TARGET_CONTRACT_ADDRESS,
            target_function: TARGET_FUNCTION_SELECTOR,
            payload: Default::default(),
            max_fee: MAX_FEE,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("{:?} is not a valid number", raw),
        }),
        None => Ok(default),
    }
}
