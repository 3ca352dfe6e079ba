use std::sync::Arc;

use akonadi_ipc::Connector;
use akonadi_proto::{ChangeNotification, LoginKind, SessionId, SubscriptionChange};
use tokio::sync::mpsc;

use crate::{JobHandle, ReconnectPolicy, Session, jobs::ModifySubscriptionJob};

/// Session that receives change notifications from the server.
///
/// Every notification arriving while the bus is logged in is handed to
/// each live subscriber once, in arrival order.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    session: Session,
}

impl NotificationBus {
    /// Starts a notification bus session. Must be called within a tokio runtime.
    pub fn spawn(
        id: impl Into<SessionId>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            session: Session::spawn_as(id.into(), LoginKind::NotificationBus, connector, policy),
        }
    }

    /// Registers a new subscriber. It sees notifications arriving from now on.
    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream {
            rx: self.session.subscribe(),
        }
    }

    /// Changes what the server reports to this bus.
    ///
    /// An empty change completes immediately without contacting the server.
    pub fn modify_subscription(&self, change: SubscriptionChange) -> JobHandle<()> {
        self.session.start(ModifySubscriptionJob::new(change))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// Ordered feed of change notifications for one subscriber.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::UnboundedReceiver<ChangeNotification>,
}

impl NotificationStream {
    /// Next notification; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<ChangeNotification> {
        self.rx.recv().await
    }

    /// Next notification if one is already buffered.
    pub fn try_next(&mut self) -> Option<ChangeNotification> {
        self.rx.try_recv().ok()
    }
}
