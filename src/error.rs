//! Errors surfaced by the remote protocol client

use std::io;

use thiserror::Error;

use crate::remote::ServerEndpoint;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// The socket could not be opened, written or read
    #[error("cannot reach server {endpoint}: {source}")]
    Connection {
        endpoint: ServerEndpoint,
        #[source]
        source: io::Error,
    },
    /// The response did not have the expected shape
    #[error("unexpected response to '{command}': {reason}")]
    Parse { command: String, reason: String },
    #[error("poll engine is no longer running")]
    EngineStopped,
}

impl RemoteError {
    pub fn connection(endpoint: &ServerEndpoint, source: io::Error) -> Self {
        RemoteError::Connection {
            endpoint: endpoint.clone(),
            source,
        }
    }

    pub fn parse(command: impl Into<String>, reason: impl Into<String>) -> Self {
        RemoteError::Parse {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, RemoteError::Connection { .. })
    }
}
