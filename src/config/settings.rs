//! Client settings stored in ~/.config/retune/settings.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::poll::DEFAULT_POLL_INTERVAL;
use crate::remote::{RetryPolicy, TcpTransport};
use crate::sync::DEFAULT_CHUNK_SIZE;

/// Tunables for talking to the server; missing fields take their defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between poll ticks
    pub poll_interval_secs: u64,
    pub connect_timeout_secs: u64,
    /// Attempts for queries whose answer can come back malformed
    pub retry_attempts: u32,
    /// Backoff before the first retry, doubled after each attempt
    pub retry_backoff_ms: u64,
    pub sync_chunk_size: usize,
    /// Where `sync` stores the catalog database
    pub catalog_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            connect_timeout_secs: 5,
            retry_attempts: 5,
            retry_backoff_ms: 100,
            sync_chunk_size: DEFAULT_CHUNK_SIZE,
            catalog_path: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, writing out the defaults on first run
    pub fn load() -> Result<Self> {
        let path = super::config_file("settings.json")?;
        if path.exists() {
            return Self::load_from(&path);
        }

        let settings = Self::default();
        if let Err(e) = settings.save_to(&path) {
            warn!("Could not write default settings: {:#}", e);
        }
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse settings {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Poll interval, never shorter than one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn transport(&self) -> TcpTransport {
        match self.connect_timeout_secs {
            0 => TcpTransport::new(),
            secs => TcpTransport::with_connect_timeout(Duration::from_secs(secs)),
        }
    }

    /// Configured catalog location, or `<data dir>/retune/catalog.db`
    pub fn catalog_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.catalog_path {
            return Ok(path.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("retune").join("catalog.db"))
    }
}
