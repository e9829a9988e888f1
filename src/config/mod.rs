//! Configuration for Tributary.
//!
//! Read from `~/.config/tributary/config.toml` at startup. If the file
//! doesn't exist, a default one with comments is created. Missing fields
//! fall back to defaults.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::app::error::{Result, TributaryError};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the share API (auth + share endpoints live under it).
    pub api_base: String,
    /// WebSocket endpoint for push notifications.
    pub ws_endpoint: String,
    /// Batched video metadata endpoint.
    pub metadata_endpoint: String,
    /// API key passed to the metadata provider.
    pub metadata_api_key: String,
    /// Seconds between retry attempts after a failed refresh.
    pub retry_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8081/api/v1".to_string(),
            ws_endpoint: "ws://localhost:8081/ws".to_string(),
            metadata_endpoint: "https://www.googleapis.com/youtube/v3/videos".to_string(),
            metadata_api_key: String::new(),
            retry_interval_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self> {
        let path = Self::default_config_path()?;

        if !path.exists() {
            Self::create_default_config(&path)?;
            return Ok(Self::default());
        }

        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| TributaryError::Config(format!("{}: {}", path.display(), e)))
    }

    /// `~/.config/tributary/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TributaryError::Config("could not find config directory".into()))?;
        Ok(config_dir.join("tributary").join("config.toml"))
    }

    pub fn signin_endpoint(&self) -> String {
        format!("{}/auth/signin", self.api_base.trim_end_matches('/'))
    }

    pub fn sharing_endpoint(&self) -> String {
        format!("{}/video-sharing", self.api_base.trim_end_matches('/'))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs.max(1))
    }

    fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(Self::default_config_content().as_bytes())?;
        Ok(())
    }

    fn default_config_content() -> String {
        r#"# Tributary configuration
#
# api_base: base URL of the share API; the client calls
#   <api_base>/auth/signin and <api_base>/video-sharing under it.
# ws_endpoint: WebSocket endpoint for push notifications.
# metadata_endpoint: batched video metadata lookup endpoint.
# metadata_api_key: API key for the metadata provider.
# retry_interval_secs: how long to wait before retrying a failed refresh.

api_base = "http://localhost:8081/api/v1"
ws_endpoint = "ws://localhost:8081/ws"
metadata_endpoint = "https://www.googleapis.com/youtube/v3/videos"
metadata_api_key = ""
retry_interval_secs = 30
"#
        .to_string()
    }
}
