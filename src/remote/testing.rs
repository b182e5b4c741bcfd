//! In-memory transport for exercising the client and engines without sockets

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::command::{Action, Command};
use super::models::ServerEndpoint;
use super::transport::{ResponseStream, Transport};
use crate::error::RemoteError;

/// Pauses requests for one action until the test releases them
pub struct Gate {
    action: Action,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Transport answering from per-action scripts
///
/// Each action has a queue of responses; the last one repeats forever so a
/// polling loop keeps seeing a stable server. Actions without a script fail
/// with a refused connection.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<Action, VecDeque<Vec<u8>>>>,
    sent: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, action: Action, body: impl AsRef<[u8]>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(action)
            .or_default()
            .push_back(body.as_ref().to_vec());
        self
    }

    pub fn gated(mut self, action: Action) -> Self {
        self.gate = Some(Gate {
            action,
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        });
        self
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("transport has no gate")
    }

    /// Every command written so far, in wire form
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, action: Action) -> usize {
        let prefix = format!("{}/", action);
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    async fn next_response(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<Vec<u8>, RemoteError> {
        self.sent.lock().unwrap().push(command.encode());

        if let Some(gate) = &self.gate {
            if gate.action == command.action {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(&command.action).ok_or_else(|| {
            RemoteError::connection(
                endpoint,
                io::Error::new(io::ErrorKind::ConnectionRefused, "no script"),
            )
        })?;
        let body = if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        };
        Ok(body)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<ResponseStream, RemoteError> {
        let body = self.next_response(endpoint, command).await?;
        Ok(Box::new(Cursor::new(body)))
    }

    async fn send_and_close(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<(), RemoteError> {
        self.next_response(endpoint, command).await.map(|_| ())
    }
}
