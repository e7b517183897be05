// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use crate::error::SourceError;

pub const ENV_API_KEY: &str = "MASA_API_KEY";
pub const ENV_BASE_URL: &str = "MASA_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "MASA_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://data.dev.masalabs.ai/api";

fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_user_agent() -> String {
    format!("masa-source/{}", env!("CARGO_PKG_VERSION"))
}

/// Top-level connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// `"ENV"` means: read from `MASA_API_KEY` (resolved on load).
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ConnectorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Build from `MASA_API_KEY` / `MASA_BASE_URL` / `MASA_TIMEOUT_SECS`.
    /// A missing key is not an error here; `validate` rejects it.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::new(env::var(ENV_API_KEY).unwrap_or_default());
        if let Ok(url) = env::var(ENV_BASE_URL) {
            if !url.trim().is_empty() {
                cfg.base_url = Some(url.trim().to_string());
            }
        }
        if let Ok(raw) = env::var(ENV_TIMEOUT_SECS) {
            cfg.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} must be an integer, got {raw:?}"))?;
        }
        Ok(cfg)
    }

    /// Load from a TOML or JSON file (picked by extension, then by content).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading connector config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)?;

        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key =
                env::var(ENV_API_KEY).map_err(|_| anyhow!("Missing {ENV_API_KEY} env var"))?;
        }
        Ok(cfg)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or(DEFAULT_BASE_URL)
    }

    /// Fail fast on anything that would make every backend call fail.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.api_key.trim().is_empty() {
            return Err(SourceError::Config("Masa API key is required".into()));
        }
        if let Some(url) = &self.base_url {
            let parsed = reqwest::Url::parse(url)
                .map_err(|e| SourceError::Config(format!("invalid baseUrl {url:?}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SourceError::Config(format!(
                    "baseUrl must be http(s), got {:?}",
                    parsed.scheme()
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(SourceError::Config("timeoutSecs must be positive".into()));
        }
        Ok(())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ConnectorConfig> {
    match hint_ext {
        "toml" => return toml::from_str(s).context("parsing connector config TOML"),
        "json" => return serde_json::from_str(s).context("parsing connector config JSON"),
        _ => {}
    }
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported connector config format: {e}"))
}
