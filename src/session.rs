//! A connected playback session
//!
//! Ties the one-shot client, the command dispatcher and a running poll
//! engine to one server. Catalog syncs go through the session so polling is
//! suspended for the duration of the transfer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::error::RemoteError;
use crate::poll::{PollEngine, PollHandle, PollUpdate, RetainedSession};
use crate::remote::{CommandDispatcher, RemoteClient, RetryPolicy, Transport};
use crate::sync::{SyncEngine, SyncProgress, SyncResult};

pub struct Session {
    client: RemoteClient,
    dispatcher: CommandDispatcher,
    poll: PollHandle,
    chunk_size: usize,
    // Held from suspend to resume so overlapping syncs queue up
    sync_lock: Mutex<()>,
}

impl Session {
    /// Start polling `client`'s server, sending updates to `updates`
    pub fn start(client: RemoteClient, interval: Duration, updates: mpsc::Sender<PollUpdate>) -> Self {
        let poll = PollEngine::new(client.clone(), interval).spawn(updates);
        Self::assemble(client, poll)
    }

    /// Pick up a retained session; the last snapshot is replayed first
    pub fn restore(
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        retained: RetainedSession,
        updates: mpsc::Sender<PollUpdate>,
    ) -> Self {
        let client = RemoteClient::new(retained.endpoint.clone(), transport).with_retry(retry);
        let poll = PollEngine::restore(client.clone(), retained).spawn(updates);
        Self::assemble(client, poll)
    }

    fn assemble(client: RemoteClient, poll: PollHandle) -> Self {
        let dispatcher = CommandDispatcher::new(client.endpoint().clone(), client.transport());
        Self {
            client,
            dispatcher,
            poll,
            chunk_size: crate::sync::DEFAULT_CHUNK_SIZE,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Download the catalog with polling suspended
    ///
    /// Returns once the sync has finished and polling has been resumed.
    /// Concurrent calls run one after another.
    pub async fn sync_catalog(
        &self,
        destination: PathBuf,
        progress: Option<mpsc::Sender<SyncProgress>>,
    ) -> Result<SyncResult, RemoteError> {
        let _guard = self.sync_lock.lock().await;
        self.poll.suspend().await?;
        debug!("Polling suspended for catalog sync");

        let result = SyncEngine::new(self.client.transport())
            .with_chunk_size(self.chunk_size)
            .start(self.client.endpoint().clone(), destination, progress)
            .wait()
            .await;

        self.poll.resume().await?;
        Ok(result)
    }

    /// End the session, keeping what the poll engine knew
    pub async fn retain(self) -> Result<RetainedSession, RemoteError> {
        let retained = self.poll.retain().await?;
        info!("Session with {} retained", retained.endpoint);
        Ok(retained)
    }
}
