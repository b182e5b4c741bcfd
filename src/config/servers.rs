//! Known servers stored in ~/.config/retune/servers.json
//!
//! The list is ordered most recently used first and capped, so adding a
//! sixth server forgets the one used longest ago.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::remote::ServerEndpoint;

pub const MAX_SAVED_SERVERS: usize = 5;

/// Current servers.json format version
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedServer {
    pub endpoint: ServerEndpoint,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerList {
    /// Config format version
    pub version: u32,
    pub servers: Vec<SavedServer>,
}

impl Default for ServerList {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            servers: Vec::new(),
        }
    }
}

impl ServerList {
    pub fn load() -> Result<Self> {
        Self::load_from(&super::config_file("servers.json")?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&super::config_file("servers.json")?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No saved servers found");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read server list from {:?}", path))?;
        let list: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse server list")?;

        debug!("Loaded {} saved servers", list.servers.len());
        Ok(list)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize server list")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write server list to {:?}", path))?;

        debug!("Saved {} servers", self.servers.len());
        Ok(())
    }

    /// Mark `endpoint` as just used, adding it if it is new
    pub fn remember(&mut self, endpoint: ServerEndpoint) {
        self.servers.retain(|s| s.endpoint != endpoint);
        self.servers.insert(
            0,
            SavedServer {
                endpoint,
                last_used: Utc::now(),
            },
        );
        self.servers.truncate(MAX_SAVED_SERVERS);
    }

    /// Forget `endpoint`; returns whether it was saved
    pub fn remove(&mut self, endpoint: &ServerEndpoint) -> bool {
        let before = self.servers.len();
        self.servers.retain(|s| &s.endpoint != endpoint);
        self.servers.len() != before
    }

    pub fn most_recent(&self) -> Option<&ServerEndpoint> {
        self.servers.first().map(|s| &s.endpoint)
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(last_octet: u8) -> ServerEndpoint {
        ServerEndpoint::new(format!("192.168.1.{}", last_octet), 8484)
    }

    #[test]
    fn test_remember_moves_to_front() {
        let mut list = ServerList::default();
        list.remember(endpoint(1));
        list.remember(endpoint(2));
        list.remember(endpoint(1));

        assert_eq!(list.servers.len(), 2);
        assert_eq!(list.most_recent(), Some(&endpoint(1)));
        assert_eq!(list.servers[1].endpoint, endpoint(2));
    }

    #[test]
    fn test_list_is_capped() {
        let mut list = ServerList::default();
        for i in 1..=7 {
            list.remember(endpoint(i));
        }

        assert_eq!(list.servers.len(), MAX_SAVED_SERVERS);
        assert_eq!(list.most_recent(), Some(&endpoint(7)));
        assert!(list.servers.iter().all(|s| s.endpoint != endpoint(1)));
        assert!(list.servers.iter().all(|s| s.endpoint != endpoint(2)));
    }

    #[test]
    fn test_remove() {
        let mut list = ServerList::default();
        list.remember(endpoint(1));

        assert!(list.remove(&endpoint(1)));
        assert!(!list.remove(&endpoint(1)));
        assert!(list.is_empty());
        assert_eq!(list.most_recent(), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retune").join("servers.json");

        let mut list = ServerList::default();
        list.remember(endpoint(5));
        list.remember(ServerEndpoint::new("fe80::1", 9000));
        list.save_to(&path).unwrap();

        let loaded = ServerList::load_from(&path).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.servers, list.servers);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServerList::load_from(&dir.path().join("servers.json")).unwrap().is_empty());
    }
}
