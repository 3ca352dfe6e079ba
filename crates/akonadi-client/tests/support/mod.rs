#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use akonadi_client::{ClientConfig, ClientContext, ReconnectPolicy};
use akonadi_ipc::{
    BoxedStream, Connector, IpcError,
    codec::{decode_command, encode_response},
    framing::{read_frame, write_frame},
};
use akonadi_proto::{Command, CommandEnvelope, PROTOCOL_VERSION, Response, Tag};
use async_trait::async_trait;
use tokio::{
    io::{DuplexStream, duplex},
    sync::{Mutex, mpsc},
    time::timeout,
};

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(100);
const RETRY: Duration = Duration::from_millis(20);
const PIPE_CAPACITY: usize = 64 * 1024;

/// Connector handing the server half of every new in-memory pipe to a [`Broker`].
pub struct ChannelConnector {
    accepted: mpsc::UnboundedSender<DuplexStream>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self) -> Result<BoxedStream, IpcError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(IpcError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "broker refuses connections",
            )));
        }
        let (client, server) = duplex(PIPE_CAPACITY);
        self.accepted
            .send(server)
            .map_err(|_| IpcError::Io(std::io::ErrorKind::ConnectionRefused.into()))?;
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        "in-memory broker".to_string()
    }
}

/// Scripted stand-in for the server.
pub struct Broker {
    accepted: Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    refuse: Arc<AtomicBool>,
}

impl Broker {
    pub fn new() -> (Self, Arc<dyn Connector>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        let connector = ChannelConnector {
            accepted: tx,
            refuse: Arc::clone(&refuse),
        };
        (
            Self {
                accepted: Mutex::new(rx),
                refuse,
            },
            Arc::new(connector),
        )
    }

    /// Context with short retry delays talking to this broker.
    pub fn context(connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> ClientContext {
        let config = ClientConfig {
            reconnect: policy,
            ..ClientConfig::default()
        };
        ClientContext::with_connector(config, connector)
    }

    pub fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy {
            transport_delay: RETRY,
            handshake_delay: RETRY,
            max_handshake_failures: None,
        }
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub async fn accept(&self) -> ServerConn {
        let stream = timeout(WAIT, async { self.accepted.lock().await.recv().await })
            .await
            .expect("client should connect in time")
            .expect("connector should stay alive");
        ServerConn { stream }
    }

    /// Asserts that no connection attempt arrives for a while.
    pub async fn expect_no_connection(&self, wait: Duration) {
        let mut accepted = self.accepted.lock().await;
        if let Ok(Some(_)) = timeout(wait, accepted.recv()).await {
            panic!("unexpected connection attempt");
        }
    }

    /// Accepts a connection and completes hello and login on it.
    pub async fn accept_logged_in(&self) -> ServerConn {
        let mut conn = self.accept().await;
        conn.login(PROTOCOL_VERSION).await;
        conn
    }
}

/// Server side of one accepted connection.
pub struct ServerConn {
    stream: DuplexStream,
}

impl ServerConn {
    pub async fn send(&mut self, tag: Tag, response: Response) {
        let payload = encode_response(tag, &response).expect("response should encode");
        write_frame(&mut self.stream, &payload)
            .await
            .expect("write should succeed");
    }

    pub async fn hello(&mut self, protocol: u32) {
        self.send(
            Tag::UNSOLICITED,
            Response::Hello {
                server: "Akonadi".to_string(),
                message: "Not Really IMAP server".to_string(),
                protocol,
            },
        )
        .await;
    }

    pub async fn recv(&mut self) -> CommandEnvelope<Command> {
        let frame = timeout(WAIT, read_frame(&mut self.stream))
            .await
            .expect("client should send in time")
            .expect("read should succeed");
        decode_command(&frame).expect("command should decode")
    }

    /// Asserts that the client writes nothing for a while.
    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Ok(Ok(frame)) = timeout(wait, read_frame(&mut self.stream)).await {
            let command = decode_command(&frame).expect("command should decode");
            panic!("unexpected command {:?}", command.body);
        }
    }

    /// Asserts that the client drops the socket without writing anything.
    pub async fn expect_closed(&mut self) {
        match timeout(WAIT, read_frame(&mut self.stream)).await {
            Ok(Err(_)) => {}
            Ok(Ok(frame)) => {
                let command = decode_command(&frame).expect("command should decode");
                panic!("expected close, got {:?}", command.body);
            }
            Err(_) => panic!("client kept the socket open"),
        }
    }

    /// Greets, then accepts the login. Returns the login tag.
    pub async fn login(&mut self, protocol: u32) -> Tag {
        self.hello(protocol).await;
        let login = self.recv().await;
        assert!(
            matches!(login.body, Command::Login { .. }),
            "first command must be login, got {:?}",
            login.body
        );
        self.send(login.tag, Response::Login {}).await;
        login.tag
    }
}
