//! Background playback polling
//!
//! The engine runs as one tokio task per session. While nothing is playing
//! it only asks for `status/`; once playback starts it polls the aggregate
//! `all/` query every interval and pushes updates to a channel. Control
//! messages (suspend, resume, retain) are only read between ticks, so a
//! caller that suspends the engine knows no request is still in flight.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use super::diff::{UpdateKind, classify};
use super::retained::{EnginePhase, RetainedSession};
use crate::error::RemoteError;
use crate::remote::{PlaybackSnapshot, RemoteClient};
use crate::utils::CoverImage;

/// Default time between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Control messages queued on the handle
const CONTROL_CAPACITY: usize = 8;

/// One observation of the server, sent to the update channel
#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub snapshot: PlaybackSnapshot,
    pub cover: Option<Arc<CoverImage>>,
    pub kind: UpdateKind,
}

enum Control {
    Suspend(oneshot::Sender<()>),
    Resume,
    Retain(oneshot::Sender<RetainedSession>),
}

/// Handle to a running poll engine
///
/// The engine stops once every handle is dropped or its update receiver
/// goes away.
#[derive(Clone)]
pub struct PollHandle {
    control: mpsc::Sender<Control>,
}

impl PollHandle {
    /// Stop ticking; resolves once any in-flight tick has completed
    pub async fn suspend(&self) -> Result<(), RemoteError> {
        let (ack, done) = oneshot::channel();
        self.send(Control::Suspend(ack)).await?;
        done.await.map_err(|_| RemoteError::EngineStopped)
    }

    /// Restart ticking; the first tick comes one full interval later
    pub async fn resume(&self) -> Result<(), RemoteError> {
        self.send(Control::Resume).await
    }

    /// Stop the engine and hand back its state
    pub async fn retain(&self) -> Result<RetainedSession, RemoteError> {
        let (reply, retained) = oneshot::channel();
        self.send(Control::Retain(reply)).await?;
        retained.await.map_err(|_| RemoteError::EngineStopped)
    }

    async fn send(&self, message: Control) -> Result<(), RemoteError> {
        self.control
            .send(message)
            .await
            .map_err(|_| RemoteError::EngineStopped)
    }
}

/// Polling state machine for one server
pub struct PollEngine {
    client: RemoteClient,
    interval: Duration,
    phase: EnginePhase,
    last: Option<PlaybackSnapshot>,
    cover: Option<Arc<CoverImage>>,
    restored: bool,
}

impl PollEngine {
    pub fn new(client: RemoteClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            phase: EnginePhase::Idle,
            last: None,
            cover: None,
            restored: false,
        }
    }

    /// Rebuild an engine from retained state
    ///
    /// `client` is expected to point at `retained.endpoint`. The retained
    /// snapshot is emitted once as a full update before the first tick.
    pub fn restore(client: RemoteClient, retained: RetainedSession) -> Self {
        debug!(
            "Restoring poll engine for {} captured at {}",
            retained.endpoint, retained.captured_at
        );
        Self {
            client,
            interval: retained.interval,
            phase: retained.phase,
            last: retained.snapshot,
            cover: retained.cover.map(Arc::new),
            restored: true,
        }
    }

    /// Run the engine on its own task
    pub fn spawn(self, updates: mpsc::Sender<PollUpdate>) -> PollHandle {
        let (control, inbox) = mpsc::channel(CONTROL_CAPACITY);
        tokio::spawn(self.run(updates, inbox));
        PollHandle { control }
    }

    async fn run(mut self, updates: mpsc::Sender<PollUpdate>, mut inbox: mpsc::Receiver<Control>) {
        info!(
            "Polling {} every {:?}",
            self.client.endpoint(),
            self.interval
        );

        if self.restored {
            if let Some(snapshot) = self.last.clone() {
                let replay = PollUpdate {
                    snapshot,
                    cover: self.cover.clone(),
                    kind: UpdateKind::Full,
                };
                if updates.send(replay).await.is_err() {
                    return;
                }
            }
        } else if !self.tick_and_send(&updates).await {
            return;
        }

        let mut suspended = false;
        let sleep = time::sleep(self.interval);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep, if !suspended => {
                    if !self.tick_and_send(&updates).await {
                        break;
                    }
                    sleep.as_mut().reset(Instant::now() + self.interval);
                }
                message = inbox.recv() => match message {
                    Some(Control::Suspend(ack)) => {
                        debug!("Poll engine suspended");
                        suspended = true;
                        let _ = ack.send(());
                    }
                    Some(Control::Resume) => {
                        if suspended {
                            debug!("Poll engine resumed");
                            suspended = false;
                            sleep.as_mut().reset(Instant::now() + self.interval);
                        }
                    }
                    Some(Control::Retain(reply)) => {
                        let _ = reply.send(self.retained());
                        break;
                    }
                    None => break,
                },
            }
        }

        info!("Stopped polling {}", self.client.endpoint());
    }

    /// Returns false once nobody is listening for updates
    async fn tick_and_send(&mut self, updates: &mpsc::Sender<PollUpdate>) -> bool {
        match self.tick().await {
            Some(update) => updates.send(update).await.is_ok(),
            None => !updates.is_closed(),
        }
    }

    async fn tick(&mut self) -> Option<PollUpdate> {
        if self.phase == EnginePhase::Idle {
            match self.client.status().await {
                Ok(status) if status.is_idle() => return None,
                Ok(status) => {
                    info!("Server reports {}, polling playback state", status);
                    self.phase = EnginePhase::Active;
                }
                Err(e) => {
                    warn!("Status poll failed: {}", e);
                    return None;
                }
            }
        }

        let snapshot = match self.client.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping poll tick: {}", e);
                return None;
            }
        };

        let kind = classify(self.last.as_ref(), &snapshot);
        if snapshot.status.is_idle() {
            info!("Playback stopped, waiting for a new session");
            self.phase = EnginePhase::Idle;
        }

        if kind == UpdateKind::Full {
            debug!("Track changed: {} - {}", snapshot.artist, snapshot.track);
            self.cover = if snapshot.has_cover {
                self.fetch_cover().await
            } else {
                None
            };
        } else if snapshot.has_cover && self.cover.is_none() {
            // Earlier fetch for this track failed
            self.cover = self.fetch_cover().await;
        }

        self.last = Some(snapshot.clone());
        Some(PollUpdate {
            snapshot,
            cover: self.cover.clone(),
            kind,
        })
    }

    async fn fetch_cover(&self) -> Option<Arc<CoverImage>> {
        let data = match self.client.cover_image().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to fetch cover art: {}", e);
                return None;
            }
        };

        match tokio::task::spawn_blocking(move || CoverImage::decode(&data)).await {
            Ok(Ok(cover)) => Some(Arc::new(cover)),
            Ok(Err(e)) => {
                warn!("Discarding cover art: {:#}", e);
                None
            }
            Err(e) => {
                warn!("Cover art decoding panicked: {}", e);
                None
            }
        }
    }

    fn retained(&self) -> RetainedSession {
        RetainedSession {
            endpoint: self.client.endpoint().clone(),
            phase: self.phase,
            snapshot: self.last.clone(),
            cover: self.cover.as_deref().cloned(),
            interval: self.interval,
            captured_at: Utc::now(),
        }
    }
}
