use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::UnixStream,
    time::timeout,
};

use crate::IpcError;

/// Byte stream a session can run the protocol over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Owned, type-erased protocol stream.
pub type BoxedStream = Box<dyn AsyncStream>;

/// Opens fresh streams to the server, once per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<BoxedStream, IpcError>;

    /// Human-readable peer description for logs.
    fn describe(&self) -> String;
}

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to the server's local UNIX socket.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    /// Socket path.
    path: PathBuf,
    /// Upper bound for a single connect attempt.
    timeout: Duration,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the default connect timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Connector for UnixConnector {
    async fn connect(&self) -> Result<BoxedStream, IpcError> {
        let stream = timeout(self.timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| IpcError::Timeout)??;
        tracing::debug!(socket = %self.path.display(), "connected to server socket");
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
