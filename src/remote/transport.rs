//! One-connection-per-request transport
//!
//! The server has no response framing: it writes its answer and closes the
//! socket, so end-of-stream is the only terminator. That contract is kept
//! behind [`Transport`] so callers never deal with sockets directly.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::command::Command;
use super::models::ServerEndpoint;
use crate::error::RemoteError;

/// Read half of a request's connection; dropping it closes the connection
pub type ResponseStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect, write `command` and hand back the response stream
    async fn open(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<ResponseStream, RemoteError>;

    /// Connect, write `command` and close without reading anything back
    async fn send_and_close(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<(), RemoteError>;

    /// Send `command` and collect the whole response
    async fn send(&self, endpoint: &ServerEndpoint, command: &Command) -> Result<Bytes, RemoteError> {
        let mut stream = self.open(endpoint, command).await?;
        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .map_err(|e| RemoteError::connection(endpoint, e))?;

        debug!("{} <- {} bytes for {}", endpoint, response.len(), command);
        Ok(Bytes::from(response))
    }
}

/// Plain TCP transport
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up on connecting after `timeout` (reads are never timed out)
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
        }
    }

    async fn connect_and_write(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> io::Result<TcpStream> {
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let mut stream = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connection timed out after {:?}", timeout),
                )
            })??,
            None => connect.await?,
        };
        stream.set_nodelay(true)?;

        let wire = command.encode();
        debug!("{} -> {}", endpoint, wire);
        stream.write_all(wire.as_bytes()).await?;
        stream.flush().await?;
        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<ResponseStream, RemoteError> {
        let stream = self
            .connect_and_write(endpoint, command)
            .await
            .map_err(|e| RemoteError::connection(endpoint, e))?;
        Ok(Box::new(stream))
    }

    async fn send_and_close(
        &self,
        endpoint: &ServerEndpoint,
        command: &Command,
    ) -> Result<(), RemoteError> {
        let mut stream = self
            .connect_and_write(endpoint, command)
            .await
            .map_err(|e| RemoteError::connection(endpoint, e))?;

        // The server may already have hung up after a fire-and-forget command
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown after {} failed: {}", command, e);
        }
        Ok(())
    }
}
