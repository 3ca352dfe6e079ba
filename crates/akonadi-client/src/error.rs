use akonadi_proto::{CommandKind, ErrorCode, ProtocolError, ScopeError};
use thiserror::Error;

/// Why a job completed without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The request could not be built; nothing was sent.
    #[error("unknown error: {0}")]
    Unknown(String),
    /// The server answered with an error.
    #[error("server error [{code:?}]: {message}{}", format_detail(.detail))]
    Server {
        code: ErrorCode,
        message: String,
        detail: Option<String>,
    },
    /// The server answered with a response of another type.
    #[error("unexpected response: expected {expected:?}, got {actual:?}")]
    UnexpectedResponse {
        expected: CommandKind,
        actual: CommandKind,
    },
    /// The server speaks another protocol version.
    #[error("protocol mismatch: expected {expected}, got {actual}")]
    ProtocolMismatch { expected: u32, actual: u32 },
    /// The socket went away after the command was written.
    #[error("connection lost before the response arrived")]
    ConnectionLost,
    /// The session was explicitly disconnected.
    #[error("session disconnected")]
    Disconnected,
    /// The session gave up after repeated handshake failures.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),
    /// The command could not be put on the wire.
    #[error("transport error: {0}")]
    Transport(String),
    /// The session is gone.
    #[error("session closed")]
    SessionClosed,
}

impl From<ProtocolError> for JobError {
    fn from(err: ProtocolError) -> Self {
        JobError::Server {
            code: err.code,
            message: err.message,
            detail: err.detail,
        }
    }
}

impl From<ScopeError> for JobError {
    fn from(err: ScopeError) -> Self {
        JobError::Unknown(err.to_string())
    }
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|value| format!(" ({value})"))
        .unwrap_or_default()
}
