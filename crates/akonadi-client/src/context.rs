use std::sync::Arc;

use akonadi_ipc::{Connector, UnixConnector};
use akonadi_proto::SessionId;

use crate::{ClientConfig, NotificationBus, Session};

/// Entry point for talking to one server.
///
/// Create one per process (or per server) and pass it to whatever needs
/// sessions; it holds no connection itself.
#[derive(Clone)]
pub struct ClientContext {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
}

impl ClientContext {
    /// Context reaching the server over the configured UNIX socket.
    pub fn new(config: ClientConfig) -> Self {
        let connector = Arc::new(UnixConnector::new(config.socket_path.clone()));
        Self { config, connector }
    }

    /// Context reaching the server through a custom transport.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts a command session. Must be called within a tokio runtime.
    pub fn session(&self, id: impl Into<SessionId>) -> Session {
        Session::spawn(id, Arc::clone(&self.connector), self.config.reconnect)
    }

    /// Starts a notification bus session. Must be called within a tokio runtime.
    pub fn notification_bus(&self, id: impl Into<SessionId>) -> NotificationBus {
        NotificationBus::spawn(id, Arc::clone(&self.connector), self.config.reconnect)
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("config", &self.config)
            .field("peer", &self.connector.describe())
            .finish()
    }
}
