use thiserror::Error;

/// Transport and serialization failures on the server socket.
#[derive(Debug, Error)]
pub enum IpcError {
    /// Underlying socket I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Command encoding failed.
    #[error("failed to encode cbor payload: {0}")]
    Encode(String),
    /// Response decoding failed.
    #[error("failed to decode cbor payload: {0}")]
    Decode(String),
    /// Connecting did not finish in time.
    #[error("connect timed out")]
    Timeout,
    /// Frame size exceeded maximum allowed payload.
    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: u32, max: u32 },
}

impl IpcError {
    /// True when the peer went away rather than sending garbage.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            IpcError::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
            )
        )
    }
}
