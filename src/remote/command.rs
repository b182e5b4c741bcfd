//! Command encoding for the remote control protocol
//!
//! Every request is a single `action/param` string written as raw bytes with
//! no trailing delimiter. The server splits on `/`, so parameters that may
//! contain a slash have to go through [`escape_param`] first.

use std::fmt;

/// Character the server turns back into `/` inside `play/` parameters
pub const ESCAPED_SLASH: char = '*';

/// Actions understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Test,
    Status,
    All,
    Shuffle,
    Repeat,
    Seek,
    PlayPause,
    Prev,
    Next,
    VolumeUp,
    VolumeDown,
    Mute,
    Play,
    CoverImage,
    CoverExists,
    Sync,
    SyncCount,
    Album,
    Artist,
    Title,
    TrackCurrentTime,
    TrackTotalTime,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Test => "test",
            Action::Status => "status",
            Action::All => "all",
            Action::Shuffle => "shuffle",
            Action::Repeat => "repeat",
            Action::Seek => "seek",
            Action::PlayPause => "playPause",
            Action::Prev => "prev",
            Action::Next => "next",
            Action::VolumeUp => "volumeUp",
            Action::VolumeDown => "volumeDown",
            Action::Mute => "mute",
            Action::Play => "play",
            Action::CoverImage => "coverImage",
            Action::CoverExists => "coverExists",
            Action::Sync => "sync",
            Action::SyncCount => "syncCount",
            Action::Album => "album",
            Action::Artist => "artist",
            Action::Title => "title",
            Action::TrackCurrentTime => "trackCurrentTime",
            Action::TrackTotalTime => "trackTotalTime",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single protocol request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub param: Option<String>,
}

impl Command {
    /// Command without a parameter
    pub fn new(action: Action) -> Self {
        Self {
            action,
            param: None,
        }
    }

    /// Command with a parameter, sent verbatim
    pub fn with_param(action: Action, param: impl Into<String>) -> Self {
        Self {
            action,
            param: Some(param.into()),
        }
    }

    pub fn seek(position_secs: u32) -> Self {
        Self::with_param(Action::Seek, position_secs.to_string())
    }

    /// Play a track by URI, escaping the slashes the URI contains
    pub fn play(uri: &str) -> Self {
        Self::with_param(Action::Play, escape_param(uri))
    }

    /// Wire form: `action/param`, or `action/` without a parameter
    pub fn encode(&self) -> String {
        format!("{}/{}", self.action, self.param.as_deref().unwrap_or(""))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Replace every `/` with [`ESCAPED_SLASH`]
///
/// This scheme is lossy: a value that already contains `*` comes out of the
/// server's unescaping with a `/` in its place. It is acceptable only because
/// the URIs sent here come from the server's own catalog.
pub fn escape_param(value: &str) -> String {
    value.replace('/', &ESCAPED_SLASH.to_string())
}
