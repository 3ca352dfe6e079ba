use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use akonadi_ipc::Connector;
use akonadi_proto::{
    ChangeNotification, Command, LoginKind, PROTOCOL_VERSION, Response, ResponseEnvelope,
    SessionId, Tag, TagAllocator,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    JobError, ReconnectPolicy,
    connection::{ConnectionEvent, ConnectionHandle, ConnectionThread},
    handshake::{Handshake, HandshakeAction, HandshakeError, SessionState},
    job::{Job, JobHandle, JobRunner, PendingJob},
};

pub(crate) enum SessionRequest {
    Submit {
        tag: Tag,
        command: Command,
        job: Box<dyn PendingJob>,
    },
    Subscribe(mpsc::UnboundedSender<ChangeNotification>),
    Reconnect,
    ForceReconnect,
    Disconnect,
}

/// A named logical connection to the server.
///
/// Cloning is cheap; the session shuts down once every clone is dropped.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    requests: mpsc::UnboundedSender<SessionRequest>,
    tags: Arc<TagAllocator>,
    state: watch::Receiver<SessionState>,
}

impl Session {
    /// Starts a regular command session. Must be called within a tokio runtime.
    pub fn spawn(
        id: impl Into<SessionId>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self::spawn_as(id.into(), LoginKind::Client, connector, policy)
    }

    pub(crate) fn spawn_as(
        id: SessionId,
        kind: LoginKind,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (connection, events, _task) = ConnectionThread::spawn(connector, policy.transport_delay);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let tags = Arc::new(TagAllocator::new());

        let actor = SessionActor {
            id: id.clone(),
            kind,
            policy,
            connection,
            events,
            requests: requests_rx,
            handshake: Handshake::new(id.clone(), kind),
            tags: Arc::clone(&tags),
            state: state_tx,
            pending: HashMap::new(),
            subscribers: Vec::new(),
            handshake_failures: 0,
            last_handshake_error: None,
        };
        tokio::spawn(actor.run());

        Self {
            id,
            requests: requests_tx,
            tags,
            state: state_rx,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Waits until the session reaches `state`.
    pub async fn wait_for(&self, state: SessionState) -> Result<(), JobError> {
        let mut changes = self.state.clone();
        changes
            .wait_for(|current| *current == state)
            .await
            .map(|_| ())
            .map_err(|_| JobError::SessionClosed)
    }

    /// Starts a job. The command is queued until the session is logged in.
    pub fn start<J: Job>(&self, mut job: J) -> JobHandle<J::Output> {
        if let Some(output) = job.local_result() {
            debug!(session = %self.id, kind = ?job.kind(), "job completed locally");
            return JobHandle::ready(Ok(output));
        }

        let command = match job.build_command() {
            Ok(command) => command,
            Err(err) => {
                debug!(session = %self.id, kind = ?job.kind(), error = %err, "job failed before sending");
                return JobHandle::ready(Err(err));
            }
        };

        let tag = self.tags.next();
        let (runner, handle) = JobRunner::new(job, tag);
        let request = SessionRequest::Submit {
            tag,
            command,
            job: Box::new(runner),
        };
        if let Err(mpsc::error::SendError(SessionRequest::Submit { job, .. })) =
            self.requests.send(request)
        {
            job.fail(JobError::SessionClosed);
        }
        handle
    }

    /// Starts a job and waits for its result.
    pub async fn exec<J: Job>(&self, job: J) -> Result<J::Output, JobError> {
        self.start(job).await
    }

    /// Starts a job and blocks the calling thread until it completes.
    pub fn exec_blocking<J: Job>(&self, job: J) -> Result<J::Output, JobError> {
        self.start(job).wait_blocking()
    }

    /// Connects unless already connected. Also rearms a session that gave up.
    pub fn reconnect(&self) {
        self.request(SessionRequest::Reconnect);
    }

    /// Drops the current socket and connects again right away.
    pub fn force_reconnect(&self) {
        self.request(SessionRequest::ForceReconnect);
    }

    /// Closes the socket and fails every outstanding job with
    /// [`JobError::Disconnected`]. Later jobs wait for [`Self::reconnect`].
    pub fn disconnect(&self) {
        self.request(SessionRequest::Disconnect);
    }

    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<ChangeNotification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.request(SessionRequest::Subscribe(tx));
        rx
    }

    fn request(&self, request: SessionRequest) {
        if self.requests.send(request).is_err() {
            debug!(session = %self.id, "session already closed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

enum Wake {
    Event(Option<ConnectionEvent>),
    Request(Option<SessionRequest>),
}

struct SessionActor {
    id: SessionId,
    kind: LoginKind,
    policy: ReconnectPolicy,
    connection: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    requests: mpsc::UnboundedReceiver<SessionRequest>,
    handshake: Handshake,
    tags: Arc<TagAllocator>,
    state: watch::Sender<SessionState>,
    /// Jobs waiting for responses, keyed by the tag of their command.
    pending: HashMap<Tag, Box<dyn PendingJob>>,
    subscribers: Vec<mpsc::UnboundedSender<ChangeNotification>>,
    handshake_failures: u32,
    last_handshake_error: Option<HandshakeError>,
}

impl SessionActor {
    async fn run(mut self) {
        loop {
            // Requests first: a subscriber or disconnect issued before a frame
            // arrived takes effect before that frame is handled.
            let wake = tokio::select! {
                biased;
                request = self.requests.recv() => Wake::Request(request),
                event = self.events.recv() => Wake::Event(event),
            };

            match wake {
                Wake::Event(Some(event)) => self.on_event(event),
                Wake::Request(Some(request)) => self.on_request(request),
                Wake::Event(None) | Wake::Request(None) => break,
            }
        }

        self.connection.shutdown();
        self.connection.queue().take_all();
        self.fail_all(JobError::SessionClosed);
        debug!(session = %self.id, "session stopped");
    }

    fn on_request(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::Submit { tag, command, job } => self.submit(tag, command, job),
            SessionRequest::Subscribe(subscriber) => self.subscribers.push(subscriber),
            SessionRequest::Reconnect => {
                if self.handshake.state() == SessionState::Failed {
                    info!(session = %self.id, "rearming session after handshake failures");
                    self.handshake.rearm();
                    self.handshake_failures = 0;
                    self.last_handshake_error = None;
                    self.publish_state();
                }
                self.connection.reconnect();
            }
            SessionRequest::ForceReconnect => self.connection.force_reconnect(),
            SessionRequest::Disconnect => {
                let discarded = self.connection.queue().take_all();
                if !discarded.is_empty() {
                    debug!(session = %self.id, count = discarded.len(), "discarding queued commands");
                }
                self.fail_all(JobError::Disconnected);
                self.connection.disconnect();
            }
        }
    }

    fn submit(&mut self, tag: Tag, command: Command, job: Box<dyn PendingJob>) {
        if self.handshake.state() == SessionState::Failed {
            job.fail(self.handshake_failed_error());
            return;
        }
        if let Some(actual) = self.handshake.version_mismatch() {
            job.fail(JobError::ProtocolMismatch {
                expected: PROTOCOL_VERSION,
                actual,
            });
            return;
        }

        debug!(session = %self.id, %tag, kind = ?command.kind(), "queueing command");
        self.pending.insert(tag, job);
        self.connection.send_command(tag, command);
    }

    fn on_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                if self.handshake.state() == SessionState::Failed {
                    self.connection.disconnect();
                    return;
                }
                self.handshake.on_connected();
                self.publish_state();
            }
            ConnectionEvent::ConnectFailed { error } => {
                debug!(session = %self.id, error = %error, "server not reachable yet");
            }
            ConnectionEvent::Disconnected { error } => {
                self.handshake.on_disconnected();
                self.publish_state();
                if let Some(error) = error {
                    warn!(session = %self.id, error = %error, "socket error");
                }
                self.fail_written(JobError::ConnectionLost);
            }
            ConnectionEvent::SendFailed { tag, error } => {
                if let Some(job) = self.pending.remove(&tag) {
                    debug!(session = %self.id, %tag, kind = ?job.kind(), "failing unsendable command");
                    job.fail(JobError::Transport(error));
                }
            }
            ConnectionEvent::Frame(frame) => {
                let action = self.handshake.on_frame(frame, &self.tags);
                self.on_handshake_action(action);
            }
        }
    }

    fn on_handshake_action(&mut self, action: HandshakeAction) {
        match action {
            HandshakeAction::SendLogin { tag, command } => {
                debug!(session = %self.id, %tag, kind = ?self.kind, "sending login");
                self.publish_state();
                self.connection.send_handshake(tag, command);
            }
            HandshakeAction::Established => {
                self.handshake_failures = 0;
                self.last_handshake_error = None;
                info!(
                    session = %self.id,
                    protocol = self.handshake.server_protocol().unwrap_or_default(),
                    "session logged in"
                );
                if let Some(actual) = self.handshake.version_mismatch() {
                    warn!(session = %self.id, expected = PROTOCOL_VERSION, actual, "server protocol mismatch");
                    for (tag, _) in self.connection.queue().take_all() {
                        if let Some(job) = self.pending.remove(&tag) {
                            job.fail(JobError::ProtocolMismatch {
                                expected: PROTOCOL_VERSION,
                                actual,
                            });
                        }
                    }
                }
                self.publish_state();
                self.connection.open_queue();
            }
            HandshakeAction::Reset(error) => self.on_handshake_failure(error),
            HandshakeAction::Deliver(frame) => self.dispatch(frame),
            HandshakeAction::Stale(frame) => {
                debug!(session = %self.id, tag = %frame.tag, kind = ?frame.body.kind(), "ignoring stale frame");
            }
        }
    }

    fn on_handshake_failure(&mut self, error: HandshakeError) {
        self.handshake_failures = self.handshake_failures.saturating_add(1);
        warn!(
            session = %self.id,
            attempt = self.handshake_failures,
            error = %error,
            "handshake failed"
        );
        self.last_handshake_error = Some(error);

        if let Some(max) = self.policy.max_handshake_failures
            && self.handshake_failures >= max
        {
            warn!(session = %self.id, "giving up after repeated handshake failures");
            self.handshake.give_up();
            self.publish_state();
            let error = self.handshake_failed_error();
            self.connection.queue().take_all();
            self.fail_all(error);
            self.connection.disconnect();
            return;
        }

        self.publish_state();
        self.connection.reset(self.policy.handshake_delay);
    }

    fn dispatch(&mut self, frame: ResponseEnvelope<Response>) {
        let ResponseEnvelope { tag, body } = frame;
        match body {
            Response::ChangeNotification { notification } => self.broadcast(notification),
            Response::Hello { .. } => {
                warn!(session = %self.id, "unexpected hello on a logged in session");
            }
            body => match self.pending.get_mut(&tag) {
                Some(job) => {
                    if job.on_response(body) {
                        self.pending.remove(&tag);
                    }
                }
                None => {
                    debug!(session = %self.id, %tag, kind = ?body.kind(), "dropping response for unknown tag");
                }
            },
        }
    }

    fn broadcast(&mut self, notification: ChangeNotification) {
        if self.kind != LoginKind::NotificationBus {
            warn!(session = %self.id, "change notification on a command session, dropping");
            return;
        }
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }

    /// Fails every job whose command already left the out-queue.
    fn fail_written(&mut self, error: JobError) {
        let queued: HashSet<Tag> = self.connection.queue().tags().into_iter().collect();
        let written: Vec<Tag> = self
            .pending
            .keys()
            .filter(|tag| !queued.contains(tag))
            .copied()
            .collect();
        for tag in written {
            if let Some(job) = self.pending.remove(&tag) {
                debug!(session = %self.id, %tag, kind = ?job.kind(), "command lost with the socket");
                job.fail(error.clone());
            }
        }
    }

    fn fail_all(&mut self, error: JobError) {
        for (tag, job) in self.pending.drain() {
            debug!(session = %self.id, %tag, kind = ?job.kind(), error = %error, "failing job");
            job.fail(error.clone());
        }
    }

    fn handshake_failed_error(&self) -> JobError {
        JobError::HandshakeFailed(
            self.last_handshake_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "too many handshake failures".to_string()),
        )
    }

    fn publish_state(&self) {
        self.state.send_replace(self.handshake.state());
    }
}
