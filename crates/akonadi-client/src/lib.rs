//! Client side of the Akonadi local-socket protocol.
//!
//! A [`Session`] owns one connection to the server, performs the hello/login
//! handshake and correlates [`Job`] commands with their responses by tag.
//! A [`NotificationBus`] is a session that forwards server change
//! notifications to subscribers. [`ClientContext`] creates both from one
//! [`ClientConfig`].

mod config;
mod context;
mod error;
mod job;
mod notification_bus;
mod session;

pub mod connection;
pub mod handshake;
pub mod jobs;

pub use config::{ClientConfig, ConfigError, ReconnectPolicy};
pub use context::ClientContext;
pub use error::JobError;
pub use handshake::SessionState;
pub use job::{Job, JobHandle, JobStep};
pub use notification_bus::{NotificationBus, NotificationStream};
pub use session::Session;
