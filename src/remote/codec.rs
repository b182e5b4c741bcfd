//! Response decoding for the remote control protocol
//!
//! Responses carry no framing; the transport hands over everything the server
//! wrote before closing the connection. The functions here only look at that
//! text and never build a value from a partially valid response.

use super::command::Action;
use super::models::{PlaybackSnapshot, PlaybackStatus, RepeatMode, ShuffleMode};
use crate::error::RemoteError;

/// Number of `/`-separated fields in an `all/` response
const AGGREGATE_FIELDS: usize = 7;

/// Map a `status/` response onto a playback status
///
/// The server reports its player state in lowercase (`idle`, `playing`,
/// `paused`, `loading`, ...). Only `idle` means there is no session.
pub fn parse_status(body: &str) -> PlaybackStatus {
    if body.contains("idle") {
        PlaybackStatus::Idle
    } else if body.contains("playing") {
        PlaybackStatus::Playing
    } else if body.contains("paused") {
        PlaybackStatus::Paused
    } else {
        PlaybackStatus::Unknown
    }
}

/// Parse an `all/` response: `status/album/artist/track/pos/total/hasCover`
pub fn parse_snapshot(body: &str) -> Result<PlaybackSnapshot, RemoteError> {
    let command = command_name(Action::All);
    let fields: Vec<&str> = body.trim_end().split('/').collect();
    if fields.len() != AGGREGATE_FIELDS {
        return Err(RemoteError::parse(
            command,
            format!(
                "expected {} fields, got {}",
                AGGREGATE_FIELDS,
                fields.len()
            ),
        ));
    }

    let position_secs = fields[4].parse::<u32>().map_err(|_| {
        RemoteError::parse(&command, format!("invalid position {:?}", fields[4]))
    })?;
    let duration_secs = fields[5].parse::<u32>().map_err(|_| {
        RemoteError::parse(&command, format!("invalid duration {:?}", fields[5]))
    })?;
    let has_cover = parse_bool_word(fields[6])
        .ok_or_else(|| RemoteError::parse(&command, format!("invalid cover flag {:?}", fields[6])))?;

    Ok(PlaybackSnapshot {
        status: parse_status(fields[0]),
        album: fields[1].to_string(),
        artist: fields[2].to_string(),
        track: fields[3].to_string(),
        position_secs,
        duration_secs,
        has_cover,
    })
}

/// Parse a bare decimal integer response
pub fn parse_integer(action: Action, body: &str) -> Result<u64, RemoteError> {
    body.trim().parse::<u64>().map_err(|_| {
        RemoteError::parse(command_name(action), format!("not an integer: {:?}", body))
    })
}

/// Parse a `coverExists/` response, which must be exactly `true` or `false`
pub fn parse_cover_exists(body: &str) -> Result<bool, RemoteError> {
    parse_bool_word(body).ok_or_else(|| {
        RemoteError::parse(
            command_name(Action::CoverExists),
            format!("not a boolean: {:?}", body),
        )
    })
}

pub fn parse_shuffle(body: &str) -> Result<ShuffleMode, RemoteError> {
    body.parse()
        .map_err(|reason: String| RemoteError::parse(command_name(Action::Shuffle), reason))
}

pub fn parse_repeat(body: &str) -> Result<RepeatMode, RemoteError> {
    body.parse()
        .map_err(|reason: String| RemoteError::parse(command_name(Action::Repeat), reason))
}

fn parse_bool_word(word: &str) -> Option<bool> {
    match word {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn command_name(action: Action) -> String {
    format!("{}/", action)
}
