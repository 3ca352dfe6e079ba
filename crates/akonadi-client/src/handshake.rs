use akonadi_proto::{
    Command, CommandKind, LoginKind, PROTOCOL_VERSION, Response, ResponseEnvelope, SessionId, Tag,
    TagAllocator,
};
use thiserror::Error;

/// Where a session stands with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket.
    Disconnected,
    /// Socket up, waiting for the server greeting.
    AwaitingHello,
    /// Login sent, waiting for the server to accept it.
    AwaitingLoginResponse,
    /// Logged in; commands flow.
    Connected,
    /// Gave up after too many handshake failures.
    Failed,
}

/// Reasons a handshake attempt is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("server rejected hello: {0}")]
    HelloRejected(String),
    #[error("server rejected login: {0}")]
    LoginRejected(String),
    #[error("unexpected {kind:?} frame (tag {tag}) while {state:?}")]
    ProtocolViolation {
        state: SessionState,
        kind: CommandKind,
        tag: Tag,
    },
}

/// What the session has to do after feeding a frame to the handshake.
#[derive(Debug)]
pub enum HandshakeAction {
    /// Write this login command ahead of everything else.
    SendLogin { tag: Tag, command: Command },
    /// Login accepted; the out-queue may drain.
    Established,
    /// Close the socket and try again later.
    Reset(HandshakeError),
    /// Regular traffic for an established session.
    Deliver(ResponseEnvelope<Response>),
    /// Frame from a socket the handshake no longer cares about.
    Stale(ResponseEnvelope<Response>),
}

/// Hello/login state machine of one session.
///
/// Anything other than the expected greeting or login answer before the
/// session is connected resets the connection.
#[derive(Debug)]
pub struct Handshake {
    session: SessionId,
    kind: LoginKind,
    state: SessionState,
    login_tag: Option<Tag>,
    server_protocol: Option<u32>,
}

impl Handshake {
    pub fn new(session: SessionId, kind: LoginKind) -> Self {
        Self {
            session,
            kind,
            state: SessionState::Disconnected,
            login_tag: None,
            server_protocol: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Protocol version announced in the last accepted hello.
    pub fn server_protocol(&self) -> Option<u32> {
        self.server_protocol
    }

    /// Server protocol version, when it differs from ours.
    pub fn version_mismatch(&self) -> Option<u32> {
        self.server_protocol
            .filter(|protocol| *protocol != PROTOCOL_VERSION)
    }

    pub fn on_connected(&mut self) {
        if self.state == SessionState::Failed {
            return;
        }
        self.state = SessionState::AwaitingHello;
        self.login_tag = None;
        self.server_protocol = None;
    }

    pub fn on_disconnected(&mut self) {
        if self.state != SessionState::Failed {
            self.state = SessionState::Disconnected;
        }
        self.login_tag = None;
        // The next server announces its own version.
        self.server_protocol = None;
    }

    /// Stops handshaking until [`Self::rearm`].
    pub fn give_up(&mut self) {
        self.state = SessionState::Failed;
        self.login_tag = None;
    }

    pub fn rearm(&mut self) {
        if self.state == SessionState::Failed {
            self.state = SessionState::Disconnected;
        }
    }

    pub fn on_frame(
        &mut self,
        frame: ResponseEnvelope<Response>,
        tags: &TagAllocator,
    ) -> HandshakeAction {
        match self.state {
            SessionState::Disconnected | SessionState::Failed => HandshakeAction::Stale(frame),
            SessionState::Connected => HandshakeAction::Deliver(frame),
            SessionState::AwaitingHello => match frame.body {
                Response::Hello { protocol, .. } => {
                    let tag = tags.next();
                    self.server_protocol = Some(protocol);
                    self.login_tag = Some(tag);
                    self.state = SessionState::AwaitingLoginResponse;
                    HandshakeAction::SendLogin {
                        tag,
                        command: Command::Login {
                            session: self.session.clone(),
                            kind: self.kind,
                        },
                    }
                }
                Response::Error {
                    kind: CommandKind::Hello,
                    error,
                } => self.reset(HandshakeError::HelloRejected(error.to_string())),
                other => self.violation(frame.tag, other.kind()),
            },
            SessionState::AwaitingLoginResponse => {
                if Some(frame.tag) != self.login_tag {
                    return self.violation(frame.tag, frame.body.kind());
                }
                match frame.body {
                    Response::Login {} => {
                        self.state = SessionState::Connected;
                        self.login_tag = None;
                        HandshakeAction::Established
                    }
                    Response::Error {
                        kind: CommandKind::Login,
                        error,
                    } => self.reset(HandshakeError::LoginRejected(error.to_string())),
                    other => self.violation(frame.tag, other.kind()),
                }
            }
        }
    }

    fn violation(&mut self, tag: Tag, kind: CommandKind) -> HandshakeAction {
        let state = self.state;
        self.reset(HandshakeError::ProtocolViolation { state, kind, tag })
    }

    fn reset(&mut self, error: HandshakeError) -> HandshakeAction {
        self.state = SessionState::Disconnected;
        self.login_tag = None;
        HandshakeAction::Reset(error)
    }
}
