//! One-shot queries against the remote control server

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::codec;
use super::command::{Action, Command};
use super::models::{PlaybackSnapshot, PlaybackStatus, RepeatMode, ServerEndpoint, ShuffleMode};
use super::transport::Transport;
use crate::error::RemoteError;

/// Bounded retry with exponential backoff for queries whose answer can be
/// momentarily malformed (integer and boolean queries)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Client for request/response queries against one server
#[derive(Clone)]
pub struct RemoteClient {
    endpoint: ServerEndpoint,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl RemoteClient {
    pub fn new(endpoint: ServerEndpoint, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Connectivity probe; the server's answer is not read
    pub async fn ping(&self) -> Result<(), RemoteError> {
        self.transport
            .send_and_close(&self.endpoint, &Command::new(Action::Test))
            .await
    }

    pub async fn status(&self) -> Result<PlaybackStatus, RemoteError> {
        let body = self.text(Action::Status).await?;
        Ok(codec::parse_status(&body))
    }

    /// Fetch the aggregate playback state
    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, RemoteError> {
        let body = self.text(Action::All).await?;
        codec::parse_snapshot(&body)
    }

    /// Advance the server's shuffle mode and return the new one
    pub async fn shuffle(&self) -> Result<ShuffleMode, RemoteError> {
        let body = self.text(Action::Shuffle).await?;
        codec::parse_shuffle(&body)
    }

    /// Advance the server's repeat mode and return the new one
    pub async fn repeat(&self) -> Result<RepeatMode, RemoteError> {
        let body = self.text(Action::Repeat).await?;
        codec::parse_repeat(&body)
    }

    pub async fn album(&self) -> Result<String, RemoteError> {
        self.text(Action::Album).await
    }

    pub async fn artist(&self) -> Result<String, RemoteError> {
        self.text(Action::Artist).await
    }

    pub async fn title(&self) -> Result<String, RemoteError> {
        self.text(Action::Title).await
    }

    /// Current playback position in seconds
    pub async fn position(&self) -> Result<u64, RemoteError> {
        self.integer(Action::TrackCurrentTime).await
    }

    /// Duration of the current track in seconds
    pub async fn duration(&self) -> Result<u64, RemoteError> {
        self.integer(Action::TrackTotalTime).await
    }

    /// Size in bytes of the catalog database a sync would transfer
    pub async fn database_size(&self) -> Result<u64, RemoteError> {
        self.integer(Action::SyncCount).await
    }

    pub async fn cover_exists(&self) -> Result<bool, RemoteError> {
        self.with_retry_loop(Action::CoverExists, codec::parse_cover_exists)
            .await
    }

    /// Raw bytes of the current track's cover art
    pub async fn cover_image(&self) -> Result<Bytes, RemoteError> {
        self.transport
            .send(&self.endpoint, &Command::new(Action::CoverImage))
            .await
    }

    async fn integer(&self, action: Action) -> Result<u64, RemoteError> {
        self.with_retry_loop(action, |body| codec::parse_integer(action, body))
            .await
    }

    async fn text(&self, action: Action) -> Result<String, RemoteError> {
        let body = self
            .transport
            .send(&self.endpoint, &Command::new(action))
            .await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Repeat the whole request until `parse` accepts the answer or the
    /// retry policy is exhausted; the last error is returned in that case
    async fn with_retry_loop<T, F>(&self, action: Action, parse: F) -> Result<T, RemoteError>
    where
        F: Fn(&str) -> Result<T, RemoteError>,
    {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 1;

        loop {
            let outcome = match self.text(action).await {
                Ok(body) => parse(&body),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.retry.max_attempts => {
                    warn!("Giving up on {} after {} attempts: {}", action, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    debug!("Attempt {} for {} failed: {}", attempt, action, e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.retry.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}
