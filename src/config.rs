//! Application configuration
//!
//! Values come from `kabu-desk.json` in the config directory when present,
//! then environment variables override individual fields.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const CONFIG_FILE: &str = "kabu-desk.json";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5000;
const DEFAULT_LOG_FILTER: &str = "kabu_desk=debug,kabu_desk_lib=debug";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the company REST API (without the `/api` prefix)
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub notification_duration_ms: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `config_dir`, then apply environment overrides
    pub fn load(config_dir: &Path) -> Result<Self> {
        let mut config = Self::from_file(config_dir)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read the config file, falling back to defaults when it is missing
    pub fn from_file(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(&path)?;

        serde_json::from_str(&data)
            .map_err(|e| AppError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply `KABU_*` overrides using the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KABU_API_BASE_URL") {
            self.api_base_url = url;
        }

        if let Some(secs) = lookup("KABU_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|_| {
                AppError::Config(format!("KABU_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }

        if let Some(ms) = lookup("KABU_NOTIFICATION_DURATION_MS") {
            self.notification_duration_ms = ms.parse().map_err(|_| {
                AppError::Config(format!("KABU_NOTIFICATION_DURATION_MS is not a number: {}", ms))
            })?;
        }

        if let Some(filter) = lookup("KABU_LOG") {
            self.log_filter = filter;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed API base URL
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base_url)?;
        if url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "api_base_url cannot be a base URL: {}",
                self.api_base_url
            )));
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }
}
