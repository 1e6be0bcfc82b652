//! TOML configuration.
//!
//! All outbound endpoints and limits live here and are handed to each
//! component at construction. See `config/khoj.example.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    pub detection: DetectionConfig,
    pub server: ServerConfig,
    /// Deadline applied to each outbound call (detection and search).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Base URL of the search engine, e.g. `http://localhost:9200`.
    pub url: String,
    #[serde(default = "default_index_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Full URL of the recognition endpoint, e.g. `http://vision:6000/detect`.
    pub url: String,
    #[serde(default = "default_field_name")]
    pub field_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_request_timeout_secs() -> u64 {
    30
}
fn default_index_name() -> String {
    "product-index".to_string()
}
fn default_field_name() -> String {
    "image".to_string()
}
fn default_max_upload_bytes() -> usize {
    10 << 20
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if !is_http_url(&config.index.url) {
        anyhow::bail!(
            "index.url must start with http:// or https:// (got '{}')",
            config.index.url
        );
    }
    if config.index.name.trim().is_empty() {
        anyhow::bail!("index.name must not be empty");
    }

    if !is_http_url(&config.detection.url) {
        anyhow::bail!(
            "detection.url must start with http:// or https:// (got '{}')",
            config.detection.url
        );
    }
    if config.detection.field_name.trim().is_empty() {
        anyhow::bail!("detection.field_name must not be empty");
    }

    if config.server.max_upload_bytes == 0 {
        anyhow::bail!("server.max_upload_bytes must be > 0");
    }

    if config.request_timeout_secs == 0 {
        anyhow::bail!("request_timeout_secs must be > 0");
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
