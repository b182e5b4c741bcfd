//! Fire-and-forget transport controls

use std::sync::Arc;
use tracing::debug;

use super::command::{Action, Command};
use super::models::ServerEndpoint;
use super::transport::Transport;
use crate::error::RemoteError;

/// Sends control commands without waiting for an answer
///
/// Failures come back as [`RemoteError::Connection`]; nothing is retried.
#[derive(Clone)]
pub struct CommandDispatcher {
    endpoint: ServerEndpoint,
    transport: Arc<dyn Transport>,
}

impl CommandDispatcher {
    pub fn new(endpoint: ServerEndpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub async fn play_pause(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::PlayPause)).await
    }

    pub async fn next(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::Next)).await
    }

    pub async fn prev(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::Prev)).await
    }

    pub async fn seek(&self, position_secs: u32) -> Result<(), RemoteError> {
        self.dispatch(Command::seek(position_secs)).await
    }

    pub async fn volume_up(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::VolumeUp)).await
    }

    pub async fn volume_down(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::VolumeDown)).await
    }

    /// Toggle mute; the server remembers the volume to restore
    pub async fn mute(&self) -> Result<(), RemoteError> {
        self.dispatch(Command::new(Action::Mute)).await
    }

    /// Start playing a catalog track by URI
    pub async fn play_uri(&self, uri: &str) -> Result<(), RemoteError> {
        self.dispatch(Command::play(uri)).await
    }

    async fn dispatch(&self, command: Command) -> Result<(), RemoteError> {
        debug!("Dispatching {} to {}", command, self.endpoint);
        self.transport.send_and_close(&self.endpoint, &command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::ScriptedTransport;

    #[tokio::test]
    async fn test_controls_write_expected_commands() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Action::PlayPause, "")
                .respond(Action::Next, "")
                .respond(Action::Seek, "")
                .respond(Action::VolumeDown, "")
                .respond(Action::Play, ""),
        );
        let dispatcher =
            CommandDispatcher::new(ServerEndpoint::new("192.168.1.5", 8484), transport.clone());

        dispatcher.play_pause().await.unwrap();
        dispatcher.next().await.unwrap();
        dispatcher.seek(120).await.unwrap();
        dispatcher.volume_down().await.unwrap();
        dispatcher.play_uri("file:///music/a.ogg").await.unwrap();

        assert_eq!(
            transport.sent(),
            vec![
                "playPause/",
                "next/",
                "seek/120",
                "volumeDown/",
                "play/file:***music*a.ogg",
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let dispatcher = CommandDispatcher::new(
            ServerEndpoint::new("192.168.1.5", 8484),
            Arc::new(ScriptedTransport::new()),
        );
        assert!(dispatcher.mute().await.unwrap_err().is_connection());
    }
}
