//! Streaming download of the server's catalog database
//!
//! `sync/` answers with the raw database bytes followed by end-of-stream.
//! The transfer is written to `<destination>.part` chunk by chunk and only
//! renamed into place once the stream ended cleanly, so an interrupted sync
//! never leaves a truncated catalog behind.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::remote::{Action, Command, ServerEndpoint, Transport};

/// Bytes read from the socket per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 8000;

/// Progress updates sent during sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProgress {
    /// Transfer is starting
    Started { destination: PathBuf },
    /// A chunk was written; `bytes_received` is the running total
    Chunk { bytes_received: u64 },
    /// Sync finished, successfully or not
    Complete(SyncResult),
}

/// Outcome of a sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Success { bytes_written: u64 },
    /// Socket or file I/O failed
    IoFailure(String),
    /// No memory for the transfer buffer or no room on the device
    OutOfMemory(String),
    /// The server's answer was unusable
    ProtocolFailure(String),
}

impl SyncResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Success { .. })
    }

    /// Underlying failure, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            SyncResult::Success { .. } => None,
            SyncResult::IoFailure(detail)
            | SyncResult::OutOfMemory(detail)
            | SyncResult::ProtocolFailure(detail) => Some(detail),
        }
    }

    /// Message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncResult::Success { .. } => "Catalog synchronised.",
            SyncResult::OutOfMemory(_) => {
                "Out of device memory. Please copy the catalog database manually."
            }
            SyncResult::IoFailure(_) | SyncResult::ProtocolFailure(_) => {
                "Something went wrong, please try resynching."
            }
        }
    }
}

#[derive(Error, Debug)]
enum SyncError {
    #[error("cannot reserve a {0}-byte transfer buffer")]
    Buffer(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("server sent an empty catalog")]
    EmptyResponse,
}

impl From<SyncError> for SyncResult {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Buffer(_) => SyncResult::OutOfMemory(message),
            SyncError::Io(e) if is_out_of_space(&e) => SyncResult::OutOfMemory(message),
            SyncError::Io(_) => SyncResult::IoFailure(message),
            SyncError::Remote(e) if e.is_connection() => SyncResult::IoFailure(message),
            SyncError::Remote(_) | SyncError::EmptyResponse => {
                SyncResult::ProtocolFailure(message)
            }
        }
    }
}

fn is_out_of_space(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded | io::ErrorKind::OutOfMemory
    )
}

/// A sync running on its own task
pub struct SyncTask {
    handle: JoinHandle<SyncResult>,
}

impl SyncTask {
    /// Wait for the sync to finish
    pub async fn wait(self) -> SyncResult {
        self.handle
            .await
            .unwrap_or_else(|e| SyncResult::ProtocolFailure(format!("sync worker failed: {}", e)))
    }
}

/// Downloads the catalog database from a server
pub struct SyncEngine {
    transport: Arc<dyn Transport>,
    chunk_size: usize,
}

impl SyncEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Start downloading the catalog from `endpoint` into `destination`
    ///
    /// Nothing is retried; a failed sync can simply be started again.
    pub fn start(
        &self,
        endpoint: ServerEndpoint,
        destination: PathBuf,
        progress: Option<mpsc::Sender<SyncProgress>>,
    ) -> SyncTask {
        let transport = Arc::clone(&self.transport);
        let chunk_size = self.chunk_size;

        let handle = tokio::spawn(async move {
            info!("Syncing catalog from {} to {:?}", endpoint, destination);
            notify(
                &progress,
                SyncProgress::Started {
                    destination: destination.clone(),
                },
            )
            .await;

            let result =
                match transfer(transport.as_ref(), &endpoint, &destination, chunk_size, &progress)
                    .await
                {
                    Ok(bytes_written) => {
                        info!("Catalog sync complete: {} bytes", bytes_written);
                        SyncResult::Success { bytes_written }
                    }
                    Err(e) => {
                        warn!("Catalog sync failed: {}", e);
                        SyncResult::from(e)
                    }
                };

            notify(&progress, SyncProgress::Complete(result.clone())).await;
            result
        });

        SyncTask { handle }
    }
}

async fn notify(progress: &Option<mpsc::Sender<SyncProgress>>, event: SyncProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}

async fn transfer(
    transport: &dyn Transport,
    endpoint: &ServerEndpoint,
    destination: &Path,
    chunk_size: usize,
    progress: &Option<mpsc::Sender<SyncProgress>>,
) -> Result<u64, SyncError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(chunk_size)
        .map_err(|_| SyncError::Buffer(chunk_size))?;
    buffer.resize(chunk_size, 0);

    let part = part_path(destination);
    let result = write_part(transport, endpoint, &part, destination, &mut buffer, progress).await;
    if result.is_err() {
        if let Err(e) = fs::remove_file(&part).await {
            debug!("Could not remove {:?}: {}", part, e);
        }
    }
    result
}

async fn write_part(
    transport: &dyn Transport,
    endpoint: &ServerEndpoint,
    part: &Path,
    destination: &Path,
    buffer: &mut [u8],
    progress: &Option<mpsc::Sender<SyncProgress>>,
) -> Result<u64, SyncError> {
    let mut file = File::create(part).await?;
    let mut stream = transport.open(endpoint, &Command::new(Action::Sync)).await?;

    let mut total = 0u64;
    loop {
        let n = stream.read(buffer).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).await?;
        total += n as u64;
        notify(progress, SyncProgress::Chunk { bytes_received: total }).await;
    }

    if total == 0 {
        return Err(SyncError::EmptyResponse);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(part, destination).await?;
    debug!("Moved {:?} into place", destination);
    Ok(total)
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("catalog"));
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::TcpTransport;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, ServerEndpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ServerEndpoint::new("127.0.0.1", port))
    }

    /// Serve one `sync/` request, writing `payload` in pieces of the given sizes
    async fn serve_catalog(listener: TcpListener, payload: Vec<u8>, pieces: &'static [usize]) {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 5];
        socket.read_exact(&mut request).await.unwrap();
        assert_eq!(&request, b"sync/");

        let mut offset = 0;
        for size in pieces.iter().cycle() {
            if offset >= payload.len() {
                break;
            }
            let end = (offset + size).min(payload.len());
            socket.write_all(&payload[offset..end]).await.unwrap();
            socket.flush().await.unwrap();
            offset = end;
        }
        socket.shutdown().await.unwrap();
    }

    fn catalog_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_sync_writes_identical_file() {
        let (listener, endpoint) = listener().await;
        let payload = catalog_bytes(50_000);
        let server = tokio::spawn(serve_catalog(
            listener,
            payload.clone(),
            &[1, 7999, 8000, 8001, 3, 12_000],
        ));

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("db").join("catalog.db");
        let (tx, mut rx) = mpsc::channel(256);

        let result = SyncEngine::new(Arc::new(TcpTransport::new()))
            .start(endpoint, destination.clone(), Some(tx))
            .wait()
            .await;
        server.await.unwrap();

        assert_eq!(result, SyncResult::Success { bytes_written: 50_000 });
        assert_eq!(std::fs::read(&destination).unwrap(), payload);
        assert!(!part_path(&destination).exists());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events.first(),
            Some(&SyncProgress::Started {
                destination: destination.clone()
            })
        );
        assert_eq!(events.last(), Some(&SyncProgress::Complete(result)));

        let totals: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SyncProgress::Chunk { bytes_received } => Some(*bytes_received),
                _ => None,
            })
            .collect();
        assert!(totals.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(totals.last(), Some(&50_000));
    }

    #[tokio::test]
    async fn test_small_chunk_size() {
        let (listener, endpoint) = listener().await;
        let payload = catalog_bytes(1000);
        let server = tokio::spawn(serve_catalog(listener, payload.clone(), &[1000]));

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("catalog.db");
        let (tx, mut rx) = mpsc::channel(256);

        let result = SyncEngine::new(Arc::new(TcpTransport::new()))
            .with_chunk_size(64)
            .start(endpoint, destination.clone(), Some(tx))
            .wait()
            .await;
        server.await.unwrap();

        assert!(result.is_success());
        assert_eq!(std::fs::read(&destination).unwrap(), payload);

        let mut chunks = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, SyncProgress::Chunk { .. }) {
                chunks += 1;
            }
        }
        assert!(chunks >= 1000 / 64);
    }

    #[tokio::test]
    async fn test_empty_response_is_protocol_failure() {
        let (listener, endpoint) = listener().await;
        let server = tokio::spawn(serve_catalog(listener, Vec::new(), &[1]));

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("catalog.db");

        let result = SyncEngine::new(Arc::new(TcpTransport::new()))
            .start(endpoint, destination.clone(), None)
            .wait()
            .await;
        server.await.unwrap();

        assert!(matches!(result, SyncResult::ProtocolFailure(_)));
        assert!(!destination.exists());
        assert!(!part_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_io_failure() {
        let (listener, endpoint) = listener().await;
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("catalog.db");

        let result = SyncEngine::new(Arc::new(TcpTransport::new()))
            .start(endpoint, destination.clone(), None)
            .wait()
            .await;

        assert!(matches!(result, SyncResult::IoFailure(_)));
        assert_eq!(
            result.user_message(),
            "Something went wrong, please try resynching."
        );
        assert!(!part_path(&destination).exists());
    }

    #[test]
    fn test_out_of_space_maps_to_out_of_memory() {
        let full = SyncResult::from(SyncError::Io(io::Error::from(io::ErrorKind::StorageFull)));
        assert!(matches!(full, SyncResult::OutOfMemory(_)));
        assert!(full.user_message().starts_with("Out of device memory"));

        let buffer = SyncResult::from(SyncError::Buffer(8000));
        assert!(matches!(buffer, SyncResult::OutOfMemory(_)));

        let denied =
            SyncResult::from(SyncError::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(matches!(denied, SyncResult::IoFailure(_)));
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/tmp/x/catalog.db")),
            PathBuf::from("/tmp/x/catalog.db.part")
        );
    }
}
