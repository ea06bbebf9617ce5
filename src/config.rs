//! Configuration management for the ledger VFS client
//!
//! Built-in defaults are layered under an optional TOML file and
//! `LEDGER_VFS_*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::error::TransportError;

/// Default config file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config";

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
const DEFAULT_WS_PORT: u16 = 8900;
const DEFAULT_RESULT_SETTLE_MS: u64 = 5000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Durability level a push subscription waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Complete client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Request/response endpoint
    /// Environment: LEDGER_VFS_RPC_URL
    pub rpc_url: String,

    /// Port of the push channel, swapped into `rpc_url` when deriving its URL
    pub ws_port: u16,

    /// Explicit push endpoint, overriding derivation
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Addressing target handed to the submission collaborator
    pub program_id: String,

    /// Durability qualifier sent with subscribe requests
    pub commitment: Commitment,

    /// Delay before a result lookup, giving the server time to settle
    pub result_settle_ms: u64,

    /// Per-request HTTP timeout, 0 disables it
    pub request_timeout_secs: u64,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            ws_port: DEFAULT_WS_PORT,
            ws_url: None,
            program_id: String::new(),
            commitment: Commitment::Finalized,
            result_settle_ms: DEFAULT_RESULT_SETTLE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from ./config.toml (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from the given file (extension optional) with environment overrides
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("rpc_url", DEFAULT_RPC_URL)?
            .set_default("ws_port", DEFAULT_WS_PORT as i64)?
            .set_default("program_id", "")?
            .set_default("commitment", "finalized")?
            .set_default("result_settle_ms", DEFAULT_RESULT_SETTLE_MS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("log_level", "info")?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("LEDGER_VFS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.rpc_url)
            .map_err(|e| ConfigError::Message(format!("rpc_url is not a valid URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "rpc_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.ws_port == 0 {
            return Err(ConfigError::Message("ws_port cannot be 0".into()));
        }

        if let Some(ws_url) = &self.ws_url {
            let url = Url::parse(ws_url)
                .map_err(|e| ConfigError::Message(format!("ws_url is not a valid URL: {}", e)))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(ConfigError::Message(format!(
                    "ws_url must use ws or wss, got {}",
                    url.scheme()
                )));
            }
        }

        Ok(())
    }

    /// Push channel URL: the explicit `ws_url`, or `rpc_url` with its scheme
    /// swapped to the streaming equivalent and its port replaced by `ws_port`
    pub fn ws_endpoint(&self) -> Result<String, TransportError> {
        if let Some(ws_url) = &self.ws_url {
            return Ok(ws_url.clone());
        }

        let invalid = || TransportError::InvalidEndpoint(self.rpc_url.clone());
        let mut url = Url::parse(&self.rpc_url).map_err(|_| invalid())?;

        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(invalid()),
        };
        url.set_scheme(scheme).map_err(|_| invalid())?;
        url.set_port(Some(self.ws_port)).map_err(|_| invalid())?;

        Ok(url.to_string())
    }

    /// Get the settle delay as Duration
    pub fn result_settle_delay(&self) -> Duration {
        Duration::from_millis(self.result_settle_ms)
    }

    /// Get the HTTP request timeout, if enabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
