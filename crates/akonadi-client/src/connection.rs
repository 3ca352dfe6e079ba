//! Socket ownership for one session.
//!
//! The connection task owns the stream, writes queued commands in FIFO order
//! and hands every decoded server frame to the session. It knows nothing
//! about the handshake: the session decides when the out-queue may drain.

use std::{
    collections::VecDeque,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use akonadi_ipc::{
    BoxedStream, Connector, IpcError,
    codec::{decode_response, encode_command},
    framing::{read_frame_or_eof, write_frame},
};
use akonadi_proto::{Command, Response, ResponseEnvelope, Tag};
use tokio::{
    io::{ReadHalf, WriteHalf, split},
    sync::{Notify, mpsc},
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, info, warn};

/// Inbound frames buffered between the reader task and the connection task.
const INBOUND_BUFFER: usize = 64;

const PEER_CLOSED: &str = "server closed the connection";

/// Describes a failed read, telling a vanished peer apart from a broken stream.
fn read_failure(err: &IpcError) -> String {
    if err.is_disconnect() {
        format!("{PEER_CLOSED}: {err}")
    } else {
        format!("unreadable data from server: {err}")
    }
}

/// Commands waiting to be written, shared between callers and the connection task.
#[derive(Debug, Default)]
pub struct OutQueue {
    entries: Mutex<VecDeque<(Tag, Command)>>,
    wake: Notify,
}

impl OutQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<(Tag, Command)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a command and wakes the connection task.
    pub fn push(&self, tag: Tag, command: Command) {
        self.lock().push_back((tag, command));
        self.wake.notify_one();
    }

    fn pop(&self) -> Option<(Tag, Command)> {
        self.lock().pop_front()
    }

    /// Removes and returns every queued command, oldest first.
    pub fn take_all(&self) -> Vec<(Tag, Command)> {
        self.lock().drain(..).collect()
    }

    /// Tags of the queued commands, oldest first.
    pub fn tags(&self) -> Vec<Tag> {
        self.lock().iter().map(|(tag, _)| *tag).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// What the connection task reports to its session.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A fresh socket is up; the server is expected to greet.
    Connected,
    /// Decoded server frame, in arrival order.
    Frame(ResponseEnvelope<Response>),
    /// A connect attempt failed; another one is scheduled.
    ConnectFailed { error: String },
    /// An open socket went away. `error` is `None` for requested teardowns.
    Disconnected { error: Option<String> },
    /// One command could not be encoded and was dropped.
    SendFailed { tag: Tag, error: String },
}

#[derive(Debug)]
enum Control {
    Reconnect,
    ForceReconnect,
    Reset(Duration),
    Disconnect,
    Handshake(Tag, Command),
    OpenQueue,
    Shutdown,
}

/// Cloneable front of a running connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    control: mpsc::UnboundedSender<Control>,
    queue: Arc<OutQueue>,
}

impl ConnectionHandle {
    /// Queues a command. It is written once a socket is up and the queue is open.
    pub fn send_command(&self, tag: Tag, command: Command) {
        self.queue.push(tag, command);
    }

    /// Writes a handshake command ahead of the out-queue.
    pub fn send_handshake(&self, tag: Tag, command: Command) {
        self.send_control(Control::Handshake(tag, command));
    }

    /// Lets the connection drain the out-queue on the current socket.
    pub fn open_queue(&self) {
        self.send_control(Control::OpenQueue);
    }

    /// Connects now unless a socket is already up.
    pub fn reconnect(&self) {
        self.send_control(Control::Reconnect);
    }

    /// Drops the current socket, if any, and connects now.
    pub fn force_reconnect(&self) {
        self.send_control(Control::ForceReconnect);
    }

    /// Drops the current socket and connects again after `delay`.
    pub fn reset(&self, delay: Duration) {
        self.send_control(Control::Reset(delay));
    }

    /// Drops the current socket and stays idle until [`Self::reconnect`].
    pub fn disconnect(&self) {
        self.send_control(Control::Disconnect);
    }

    /// Stops the connection task.
    pub fn shutdown(&self) {
        self.send_control(Control::Shutdown);
    }

    pub fn queue(&self) -> &OutQueue {
        &self.queue
    }

    fn send_control(&self, control: Control) {
        if self.control.send(control).is_err() {
            debug!("connection task already stopped");
        }
    }
}

enum Inbound {
    Frame(Vec<u8>),
    Closed,
    Failed(IpcError),
}

struct OpenLink {
    writer: WriteHalf<BoxedStream>,
    inbound: mpsc::Receiver<Inbound>,
    reader: JoinHandle<()>,
    queue_open: bool,
}

impl Drop for OpenLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

enum Link {
    /// Disconnected on request.
    Idle,
    /// Next connect attempt is due at the given instant.
    Pending(Instant),
    Open(OpenLink),
}

enum Wake {
    Control(Option<Control>),
    Deadline,
    Connect(Result<BoxedStream, IpcError>),
    Inbound(Option<Inbound>),
    QueueReady,
}

/// Task state owning the socket of one session.
pub struct ConnectionThread {
    connector: Arc<dyn Connector>,
    retry_delay: Duration,
    queue: Arc<OutQueue>,
    control: mpsc::UnboundedReceiver<Control>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    link: Link,
    attempt: u32,
}

impl ConnectionThread {
    /// Spawns the connection task; the first connect attempt starts right away.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        retry_delay: Duration,
    ) -> (
        ConnectionHandle,
        mpsc::UnboundedReceiver<ConnectionEvent>,
        JoinHandle<()>,
    ) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(OutQueue::default());

        let thread = Self {
            connector,
            retry_delay,
            queue: Arc::clone(&queue),
            control: control_rx,
            events: events_tx,
            link: Link::Pending(Instant::now()),
            attempt: 0,
        };
        let task = tokio::spawn(thread.run());

        (
            ConnectionHandle {
                control: control_tx,
                queue,
            },
            events_rx,
            task,
        )
    }

    async fn run(mut self) {
        loop {
            if self.events.is_closed() {
                break;
            }

            let wake = match &mut self.link {
                Link::Idle => Wake::Control(self.control.recv().await),
                Link::Pending(deadline) => {
                    let deadline = *deadline;
                    tokio::select! {
                        biased;
                        control = self.control.recv() => Wake::Control(control),
                        _ = sleep_until(deadline) => Wake::Deadline,
                    }
                }
                Link::Open(open) => {
                    if open.queue_open && !self.queue.is_empty() {
                        Wake::QueueReady
                    } else {
                        let queue_open = open.queue_open;
                        tokio::select! {
                            biased;
                            control = self.control.recv() => Wake::Control(control),
                            inbound = open.inbound.recv() => Wake::Inbound(inbound),
                            _ = self.queue.wake.notified(), if queue_open => Wake::QueueReady,
                        }
                    }
                }
            };

            let keep_running = match wake {
                Wake::Control(Some(control)) => self.on_control(control).await,
                Wake::Control(None) => false,
                Wake::Deadline => self.connect().await,
                Wake::Connect(_) => true,
                Wake::Inbound(inbound) => {
                    self.on_inbound(inbound);
                    true
                }
                Wake::QueueReady => {
                    self.drain_queue().await;
                    true
                }
            };

            if !keep_running {
                break;
            }
        }

        self.teardown(None);
        debug!(peer = %self.connector.describe(), "connection task stopped");
    }

    async fn connect(&mut self) -> bool {
        self.attempt = self.attempt.saturating_add(1);
        let wake = tokio::select! {
            biased;
            control = self.control.recv() => Wake::Control(control),
            result = self.connector.connect() => Wake::Connect(result),
        };

        match wake {
            Wake::Control(Some(control)) => self.on_control(control).await,
            Wake::Control(None) => false,
            Wake::Connect(Ok(stream)) => {
                self.open(stream);
                true
            }
            Wake::Connect(Err(err)) => {
                warn!(
                    peer = %self.connector.describe(),
                    attempt = self.attempt,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    error = %err,
                    "failed to connect to server"
                );
                self.emit(ConnectionEvent::ConnectFailed {
                    error: err.to_string(),
                });
                self.link = Link::Pending(Instant::now() + self.retry_delay);
                true
            }
            _ => true,
        }
    }

    fn open(&mut self, stream: BoxedStream) {
        let (reader, writer) = split(stream);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let reader = tokio::spawn(read_loop(reader, inbound_tx));

        info!(
            peer = %self.connector.describe(),
            attempt = self.attempt,
            "connected to server"
        );
        self.attempt = 0;
        self.link = Link::Open(OpenLink {
            writer,
            inbound: inbound_rx,
            reader,
            queue_open: false,
        });
        self.emit(ConnectionEvent::Connected);
    }

    async fn on_control(&mut self, control: Control) -> bool {
        match control {
            Control::Reconnect => {
                if matches!(self.link, Link::Open(_)) {
                    debug!("reconnect requested while connected, ignoring");
                } else {
                    self.link = Link::Pending(Instant::now());
                }
            }
            Control::ForceReconnect => {
                self.teardown(None);
                self.link = Link::Pending(Instant::now());
            }
            Control::Reset(delay) => {
                self.teardown(None);
                self.link = Link::Pending(Instant::now() + delay);
            }
            Control::Disconnect => {
                self.teardown(None);
                self.link = Link::Idle;
            }
            Control::OpenQueue => {
                if let Link::Open(open) = &mut self.link {
                    open.queue_open = true;
                }
            }
            Control::Handshake(tag, command) => {
                if matches!(self.link, Link::Open(_)) {
                    self.write(tag, &command).await;
                } else {
                    debug!(%tag, "dropping handshake command, socket is gone");
                }
            }
            Control::Shutdown => return false,
        }
        true
    }

    fn on_inbound(&mut self, inbound: Option<Inbound>) {
        match inbound {
            Some(Inbound::Frame(bytes)) => match decode_response(&bytes) {
                Ok(frame) => self.emit(ConnectionEvent::Frame(frame)),
                Err(err) => self.fail(err.to_string()),
            },
            Some(Inbound::Closed) => self.fail(PEER_CLOSED.to_string()),
            Some(Inbound::Failed(err)) => self.fail(read_failure(&err)),
            None => self.fail("socket reader stopped".to_string()),
        }
    }

    async fn drain_queue(&mut self) {
        while matches!(&self.link, Link::Open(open) if open.queue_open) {
            let Some((tag, command)) = self.queue.pop() else {
                break;
            };
            self.write(tag, &command).await;
        }
    }

    async fn write(&mut self, tag: Tag, command: &Command) {
        let payload = match encode_command(tag, command) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%tag, error = %err, "failed to encode command");
                self.emit(ConnectionEvent::SendFailed {
                    tag,
                    error: err.to_string(),
                });
                return;
            }
        };

        let Link::Open(open) = &mut self.link else {
            return;
        };
        debug!(%tag, kind = ?command.kind(), "writing command");
        if let Err(err) = write_frame(&mut open.writer, &payload).await {
            self.fail(err.to_string());
        }
    }

    /// Handles a broken socket: report it and schedule the next attempt.
    fn fail(&mut self, error: String) {
        warn!(
            peer = %self.connector.describe(),
            delay_ms = self.retry_delay.as_millis() as u64,
            error = %error,
            "socket error, reconnecting"
        );
        self.teardown(Some(error));
        self.link = Link::Pending(Instant::now() + self.retry_delay);
    }

    fn teardown(&mut self, error: Option<String>) {
        if let Link::Open(open) = mem::replace(&mut self.link, Link::Idle) {
            drop(open);
            self.emit(ConnectionEvent::Disconnected { error });
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }
}

async fn read_loop(mut reader: ReadHalf<BoxedStream>, inbound: mpsc::Sender<Inbound>) {
    loop {
        let next = match read_frame_or_eof(&mut reader).await {
            Ok(Some(frame)) => Inbound::Frame(frame),
            Ok(None) => Inbound::Closed,
            Err(err) => Inbound::Failed(err),
        };
        let last = !matches!(next, Inbound::Frame(_));
        if inbound.send(next).await.is_err() || last {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn reset_socket_reads_as_peer_close() {
        let err = IpcError::Io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(read_failure(&err).starts_with(PEER_CLOSED));
    }

    #[test]
    fn oversized_frame_is_not_a_close() {
        let err = IpcError::FrameTooLarge { size: 10, max: 4 };
        let message = read_failure(&err);
        assert!(message.starts_with("unreadable data from server"));
        assert!(message.contains("frame too large"));
    }
}
