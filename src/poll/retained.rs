//! Poll state carried across a stop and restart

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::remote::{PlaybackSnapshot, ServerEndpoint};
use crate::utils::CoverImage;

/// Which query the next tick issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Nothing playing; only `status/` is polled
    Idle,
    /// Playback in progress; the aggregate state is polled
    Active,
}

/// Everything needed to pick polling back up without a network round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainedSession {
    pub endpoint: ServerEndpoint,
    pub phase: EnginePhase,
    pub snapshot: Option<PlaybackSnapshot>,
    pub cover: Option<CoverImage>,
    pub interval: Duration,
    pub captured_at: DateTime<Utc>,
}

impl RetainedSession {
    /// Write the session to `path` as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string(self).context("Failed to serialize retained session")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write retained session to {:?}", path))?;

        debug!("Retained session for {} at {:?}", self.endpoint, path);
        Ok(())
    }

    /// Load the session saved at `path` and remove the file
    ///
    /// A session is restored at most once; a missing file yields `None`.
    pub fn take(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No retained session at {:?}", path);
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read retained session from {:?}", path))?;
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove retained session {:?}", path))?;

        let session: Self =
            serde_json::from_str(&contents).context("Failed to parse retained session")?;
        Ok(Some(session))
    }

    /// Location used by the CLI: `<cache dir>/retune/session.json`
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?;
        Ok(cache_dir.join("retune").join("session.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::PlaybackStatus;
    use crate::utils::cover_art::sample_png;

    fn retained() -> RetainedSession {
        RetainedSession {
            endpoint: ServerEndpoint::new("192.168.1.5", 8484),
            phase: EnginePhase::Active,
            snapshot: Some(PlaybackSnapshot {
                status: PlaybackStatus::Playing,
                track: "MySong".to_string(),
                artist: "MyArtist".to_string(),
                album: "MyAlbum".to_string(),
                position_secs: 12,
                duration_secs: 180,
                has_cover: true,
            }),
            cover: Some(CoverImage::decode(&sample_png(8, 8)).unwrap()),
            interval: Duration::from_secs(1),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_then_take_consumes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let session = retained();

        session.save(&path).unwrap();
        let restored = RetainedSession::take(&path).unwrap().unwrap();

        assert_eq!(restored, session);
        assert!(!path.exists());
        assert!(RetainedSession::take(&path).unwrap().is_none());
    }

    #[test]
    fn test_take_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        assert!(RetainedSession::take(&path).is_err());
    }
}
