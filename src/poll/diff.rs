//! Deciding how much of the display an update invalidates

use serde::{Deserialize, Serialize};

use crate::remote::PlaybackSnapshot;

/// How much changed since the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// Track metadata changed; the cover was refetched or cleared
    Full,
    /// Only the playback position moved
    Partial,
}

/// Classify `current` against the last snapshot the engine emitted
pub fn classify(previous: Option<&PlaybackSnapshot>, current: &PlaybackSnapshot) -> UpdateKind {
    match previous {
        Some(prev)
            if !prev.metadata_differs(current) && prev.duration_secs == current.duration_secs =>
        {
            UpdateKind::Partial
        }
        _ => UpdateKind::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::PlaybackStatus;

    fn snapshot(track: &str, position: u32, duration: u32) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: PlaybackStatus::Playing,
            track: track.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            position_secs: position,
            duration_secs: duration,
            has_cover: true,
        }
    }

    #[test]
    fn test_first_snapshot_is_full() {
        assert_eq!(classify(None, &snapshot("A", 0, 200)), UpdateKind::Full);
    }

    #[test]
    fn test_position_only_is_partial() {
        let prev = snapshot("A", 10, 200);
        assert_eq!(classify(Some(&prev), &snapshot("A", 11, 200)), UpdateKind::Partial);
        assert_eq!(classify(Some(&prev), &prev.clone()), UpdateKind::Partial);
    }

    #[test]
    fn test_duration_change_is_full() {
        let prev = snapshot("A", 10, 200);
        assert_eq!(classify(Some(&prev), &snapshot("A", 10, 210)), UpdateKind::Full);
    }

    #[test]
    fn test_metadata_change_is_full() {
        let prev = snapshot("A", 10, 200);
        assert_eq!(classify(Some(&prev), &snapshot("B", 10, 200)), UpdateKind::Full);

        let mut paused = prev.clone();
        paused.status = PlaybackStatus::Paused;
        assert_eq!(classify(Some(&prev), &paused), UpdateKind::Full);

        let mut other_album = prev.clone();
        other_album.album = "Other".to_string();
        assert_eq!(classify(Some(&prev), &other_album), UpdateKind::Full);
    }

    #[test]
    fn test_cover_flag_alone_is_partial() {
        let prev = snapshot("A", 10, 200);
        let mut current = prev.clone();
        current.has_cover = false;
        assert_eq!(classify(Some(&prev), &current), UpdateKind::Partial);
    }
}
