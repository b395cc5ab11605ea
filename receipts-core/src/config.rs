//! Configuration management
//!
//! Settings live in `settings.json` inside the receipts directory:
//! ```json
//! {
//!   "app": {
//!     "apiBaseUrl": "http://localhost:5000/api/v1",
//!     "demoMode": false,
//!     "analyticsSource": "server",
//!     "requestTimeoutSecs": 30
//!   }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, RECEIPTS_API_URL_ENV};
use crate::services::AnalyticsSource;

const DEMO_MODE_ENV: &str = "RECEIPTS_DEMO_MODE";
const ANALYTICS_SOURCE_ENV: &str = "RECEIPTS_ANALYTICS_SOURCE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default)]
    demo_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analytics_source: Option<AnalyticsSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub demo_mode: bool,
    pub analytics_source: AnalyticsSource,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            demo_mode: false,
            analytics_source: AnalyticsSource::default(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the receipts directory
    ///
    /// Environment variables win over the settings file:
    /// `RECEIPTS_API_URL`, `RECEIPTS_DEMO_MODE`, `RECEIPTS_ANALYTICS_SOURCE`.
    pub fn load(receipts_dir: &Path) -> Result<Self> {
        let raw = read_settings(receipts_dir)?;
        let defaults = Config::default();

        let api_base_url = std::env::var(RECEIPTS_API_URL_ENV)
            .ok()
            .or(raw.app.api_base_url)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.api_base_url);

        let demo_mode = env_flag(DEMO_MODE_ENV).unwrap_or(raw.app.demo_mode);

        let analytics_source = std::env::var(ANALYTICS_SOURCE_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .or(raw.app.analytics_source)
            .unwrap_or(defaults.analytics_source);

        let request_timeout = raw
            .app
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Ok(Self {
            api_base_url,
            demo_mode,
            analytics_source,
            request_timeout,
        })
    }

    /// Persist the demo mode flag, preserving everything else in the file
    pub fn save(&self, receipts_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(receipts_dir)?;
        let mut settings = read_settings(receipts_dir)?;
        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(receipts_dir.join("settings.json"), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

fn read_settings(receipts_dir: &Path) -> Result<SettingsFile> {
    let settings_path = receipts_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
