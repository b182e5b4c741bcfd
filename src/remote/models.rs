//! Data types exchanged with the media-player server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Port the server listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 8484;

/// Address of a remote control server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ServerEndpoint {
    type Err = anyhow::Error;

    /// Accepts `host`, `host:port` and `[v6-address]:port`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Server address is empty");
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .with_context(|| format!("Unterminated IPv6 address in {:?}", s))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => anyhow::bail!("Unexpected characters after address in {:?}", s),
            };
            return Ok(Self::new(host, port));
        }

        match s.rsplit_once(':') {
            // A bare IPv6 address has several colons and no port
            Some((host, _)) if host.contains(':') => Ok(Self::new(s, DEFAULT_PORT)),
            Some((host, port)) => Ok(Self::new(host, parse_port(port)?)),
            None => Ok(Self::new(s, DEFAULT_PORT)),
        }
    }
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .with_context(|| format!("Invalid port number {:?}", port))
}

/// Playback state as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Idle,
    Unknown,
}

impl PlaybackStatus {
    pub fn is_idle(self) -> bool {
        self == PlaybackStatus::Idle
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Point-in-time capture of the server's playback state
///
/// Built only from a fully parsed `all/` response. The server does not
/// guarantee `position_secs <= duration_secs`, so display code should go
/// through [`PlaybackSnapshot::clamped_position`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub track: String,
    pub artist: String,
    pub album: String,
    pub position_secs: u32,
    pub duration_secs: u32,
    pub has_cover: bool,
}

impl PlaybackSnapshot {
    /// Position limited to the track duration (when the duration is known)
    pub fn clamped_position(&self) -> u32 {
        if self.duration_secs > 0 {
            self.position_secs.min(self.duration_secs)
        } else {
            self.position_secs
        }
    }

    /// Whether the displayed metadata differs from `other`
    pub fn metadata_differs(&self, other: &PlaybackSnapshot) -> bool {
        self.status != other.status
            || self.track != other.track
            || self.album != other.album
            || self.artist != other.artist
    }
}

/// Server-side shuffle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    Off,
    Song,
    Artist,
    Album,
    Score,
    Rating,
}

impl FromStr for ShuffleMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "off" => Ok(ShuffleMode::Off),
            "song" => Ok(ShuffleMode::Song),
            "Artist" => Ok(ShuffleMode::Artist),
            "Album" => Ok(ShuffleMode::Album),
            "Score" => Ok(ShuffleMode::Score),
            "Rating" => Ok(ShuffleMode::Rating),
            other => Err(format!("unknown shuffle mode {:?}", other)),
        }
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShuffleMode::Off => "off",
            ShuffleMode::Song => "song",
            ShuffleMode::Artist => "artist",
            ShuffleMode::Album => "album",
            ShuffleMode::Score => "score",
            ShuffleMode::Rating => "rating",
        };
        f.write_str(label)
    }
}

/// Server-side repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Single,
    All,
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "off" => Ok(RepeatMode::Off),
            "single" => Ok(RepeatMode::Single),
            "all" => Ok(RepeatMode::All),
            other => Err(format!("unknown repeat mode {:?}", other)),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RepeatMode::Off => "off",
            RepeatMode::Single => "single",
            RepeatMode::All => "all",
        };
        f.write_str(label)
    }
}
