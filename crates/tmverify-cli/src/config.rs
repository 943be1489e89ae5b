use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings for `tmverify verify`. Every field has a default, so an empty file is valid.
///
/// ```toml
/// rpc_url = "http://localhost:26657"
/// per_page = 50
/// timeout_secs = 120
/// poll_interval_ms = 1000
/// request_timeout_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Tendermint JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Validators fetched per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// How long to wait for a height that has not been produced yet
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Chain tip polling interval while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "http://tendermint.api.matic.network:80".to_string()
}

fn default_per_page() -> u32 {
    tmverify_rpc::client::DEFAULT_PER_PAGE
}

fn default_timeout_secs() -> u64 {
    tmverify_rpc::DEFAULT_BLOCK_WAIT.as_secs()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_request_timeout_secs() -> u64 {
    tmverify_rpc::client::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Flag values that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub per_page: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl VerifyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the fetch loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        let max = tmverify_rpc::client::MAX_PER_PAGE;
        if self.per_page == 0 || self.per_page > max {
            bail!("per_page must be in 1..={}, got {}", max, self.per_page);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(rpc_url) = overrides.rpc_url {
            self.rpc_url = rpc_url;
        }
        if let Some(per_page) = overrides.per_page {
            self.per_page = per_page;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
    }

    pub fn block_wait(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
