//! Async CBOR-over-UNIX-socket transport for the Akonadi client protocol.

mod error;

pub mod codec;
pub mod framing;
pub mod transport;

pub use error::IpcError;
pub use transport::{AsyncStream, BoxedStream, Connector, UnixConnector};
