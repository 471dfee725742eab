//! Bridge client: a single reconnecting WebSocket with an outbound queue.
//!
//! The client is split in two:
//!
//! - [`BridgeSession`] is a synchronous state machine.  It owns the queue,
//!   the live frame sink, and the rate-limit flags, and answers every input
//!   with a [`SessionAction`] telling its driver what to do next.
//! - [`spawn_bridge`] starts the driver task that performs those actions
//!   (dialling through a [`Connector`], arming the retry timer) and exposes a
//!   cloneable [`BridgeHandle`].
//!
//! ```text
//!            connect()/send()           open                  close / error
//! Disconnected ───────────────▶ Connecting ──────▶ Open ─────────────────────▶ Disconnected
//!      ▲                            │ failed                                     │
//!      └──── retry after 1 s ◀──────┴────────────────────────────────────────────┘
//! ```
//!
//! Payloads sent while the socket is not open are queued and flushed in FIFO
//! order as soon as it opens.  A payload whose transmission fails goes back to
//! the head of the queue, so ordering survives any number of reconnects.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, warn};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors surfaced by the bridge client and its frame sinks.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A frame could not be handed to the socket.
    #[error("bridge send failed: {0}")]
    Send(String),

    /// The client task has stopped; nothing more will be sent.
    #[error("bridge client stopped")]
    Stopped,
}

/// Why a connection attempt failed.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The socket could not even be constructed (bad URL, bad request).
    #[error("bridge socket setup failed: {0}")]
    Setup(String),

    /// The socket was constructed but the connection failed.
    #[error("bridge socket error: {0}")]
    Socket(String),
}

// ── Transport seams ───────────────────────────────────────────────────────────

/// The writable side of an open bridge socket.
///
/// Sending is synchronous and may fail immediately, like a browser socket's
/// `send`.  Implementations hand the frame to a writer task.
pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: &str) -> Result<(), BridgeError>;
    fn close(&mut self);
}

/// Something that happened on an open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A text frame arrived.
    Message(String),
    /// The peer closed the connection.
    Closed,
    /// The connection failed.
    Error(String),
}

/// An open socket: its sink plus the stream of its events.
pub struct Connection {
    pub sink: Box<dyn FrameSink>,
    pub events: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Opens bridge sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, ConnectError>;
}

// ── Session state machine ─────────────────────────────────────────────────────

/// Lifecycle of the bridge socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// What the driver must do after feeding an input to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Nothing.
    Idle,
    /// Start a connection attempt now.
    Connect,
    /// Arm the retry timer, replacing any pending one.
    ScheduleRetry,
}

/// Queue and connection bookkeeping for one bridge client.
pub struct BridgeSession {
    state: ConnectionState,
    sink: Option<Box<dyn FrameSink>>,
    queue: VecDeque<String>,
    running: bool,
    error_logged: bool,
    setup_warned: bool,
}

impl Default for BridgeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeSession {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            sink: None,
            queue: VecDeque::new(),
            running: true,
            error_logged: false,
            setup_warned: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Payloads waiting for an open socket, head first.
    pub fn queued(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }

    /// Transmits `payload` if the socket is open, otherwise queues it.
    pub fn send(&mut self, payload: String) -> SessionAction {
        if !self.running {
            debug!("bridge client stopped; dropping payload");
            return SessionAction::Idle;
        }

        match self.state {
            ConnectionState::Disconnected => {
                self.queue.push_back(payload);
                self.connect()
            }
            ConnectionState::Connecting => {
                self.queue.push_back(payload);
                SessionAction::Idle
            }
            ConnectionState::Open => {
                let Some(sink) = self.sink.as_mut() else {
                    self.queue.push_back(payload);
                    return self.reset();
                };
                match sink.send_frame(&payload) {
                    Ok(()) => SessionAction::Idle,
                    Err(e) => {
                        warn!("{e}");
                        self.queue.push_front(payload);
                        self.reset()
                    }
                }
            }
        }
    }

    /// Starts a connection attempt unless one is open or in flight.
    pub fn connect(&mut self) -> SessionAction {
        if !self.running || self.state != ConnectionState::Disconnected {
            return SessionAction::Idle;
        }
        self.state = ConnectionState::Connecting;
        SessionAction::Connect
    }

    /// The connection attempt succeeded: flush the queue.
    pub fn on_open(&mut self, mut sink: Box<dyn FrameSink>) -> SessionAction {
        if !self.running {
            sink.close();
            return SessionAction::Idle;
        }

        info!("connected to bridge");
        self.state = ConnectionState::Open;
        self.sink = Some(sink);

        if let Some(action) = self.flush() {
            return action;
        }
        self.error_logged = false;
        self.setup_warned = false;
        SessionAction::Idle
    }

    /// The connection attempt failed.
    pub fn on_connect_failed(&mut self, error: ConnectError) -> SessionAction {
        match error {
            ConnectError::Setup(_) => {
                if !self.setup_warned {
                    warn!("{error}");
                    self.setup_warned = true;
                }
                self.state = ConnectionState::Disconnected;
                self.schedule_retry()
            }
            ConnectError::Socket(reason) => self.on_socket_error(&reason),
        }
    }

    /// The open socket was closed by the peer.
    pub fn on_closed(&mut self) -> SessionAction {
        debug!("bridge socket closed");
        self.sink = None;
        self.state = ConnectionState::Disconnected;
        self.schedule_retry()
    }

    /// The socket reported an error.
    pub fn on_socket_error(&mut self, reason: &str) -> SessionAction {
        if !self.error_logged {
            warn!("bridge socket error: {reason}");
            self.error_logged = true;
        }
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        self.state = ConnectionState::Disconnected;
        self.schedule_retry()
    }

    /// Closes the socket and refuses any further work.
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Sends queued payloads in order.  Returns the follow-up action if a
    /// send failed; the failed payload is back at the head of the queue.
    fn flush(&mut self) -> Option<SessionAction> {
        while let Some(payload) = self.queue.pop_front() {
            let result = match self.sink.as_mut() {
                Some(sink) => sink.send_frame(&payload),
                None => Err(BridgeError::Send("socket is gone".to_string())),
            };
            if let Err(e) = result {
                warn!("bridge flush failed: {e}");
                self.queue.push_front(payload);
                return Some(self.reset());
            }
        }
        None
    }

    /// Drops the current socket and arms a retry.
    fn reset(&mut self) -> SessionAction {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
        self.state = ConnectionState::Disconnected;
        self.schedule_retry()
    }

    fn schedule_retry(&self) -> SessionAction {
        if !self.running || self.state == ConnectionState::Open {
            return SessionAction::Idle;
        }
        SessionAction::ScheduleRetry
    }
}

// ── Driver task ───────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Send(String),
    Connect,
    Stop,
}

/// Cloneable handle to a running bridge client.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl BridgeHandle {
    /// Queues a serialized payload for the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Stopped`] once the client has been stopped.
    pub fn send(&self, payload: impl Into<String>) -> Result<(), BridgeError> {
        self.commands
            .send(Command::Send(payload.into()))
            .map_err(|_| BridgeError::Stopped)
    }

    /// Serializes `value` to JSON and queues it.
    ///
    /// A value that cannot be serialized is logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Stopped`] once the client has been stopped.
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), BridgeError> {
        match serde_json::to_string(value) {
            Ok(payload) => self.send(payload),
            Err(e) => {
                warn!("failed to serialize bridge payload: {e}");
                Ok(())
            }
        }
    }

    /// Asks the client to connect if it is not already connected or connecting.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Closes the socket, cancels any retry, and ends the client task.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

type PendingConnect = Pin<Box<dyn Future<Output = Result<Connection, ConnectError>> + Send>>;

/// Spawns the client task for `url`.
///
/// Returns the handle and a receiver of inbound text frames.  The task does
/// not dial until [`BridgeHandle::connect`] or [`BridgeHandle::send`] is
/// called, and ends on [`BridgeHandle::stop`] or when every handle is dropped.
pub fn spawn_bridge(
    url: String,
    connector: Arc<dyn Connector>,
    retry_delay: Duration,
) -> (BridgeHandle, mpsc::UnboundedReceiver<String>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    let driver = Driver {
        url,
        connector,
        retry_delay,
        session: BridgeSession::new(),
        commands: command_rx,
        inbound: inbound_tx,
        state: state_tx,
    };
    tokio::spawn(driver.run());

    (
        BridgeHandle {
            commands: command_tx,
            state: state_rx,
        },
        inbound_rx,
    )
}

struct Driver {
    url: String,
    connector: Arc<dyn Connector>,
    retry_delay: Duration,
    session: BridgeSession,
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: mpsc::UnboundedSender<String>,
    state: watch::Sender<ConnectionState>,
}

impl Driver {
    async fn run(mut self) {
        let mut pending: Option<PendingConnect> = None;
        let mut events: Option<mpsc::UnboundedReceiver<SocketEvent>> = None;
        let mut retry: Option<Pin<Box<Sleep>>> = None;

        loop {
            let action = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send(payload)) => self.session.send(payload),
                    Some(Command::Connect) => self.session.connect(),
                    Some(Command::Stop) | None => break,
                },
                result = next_connect(&mut pending) => {
                    pending = None;
                    match result {
                        Ok(connection) => {
                            events = Some(connection.events);
                            self.session.on_open(connection.sink)
                        }
                        Err(e) => self.session.on_connect_failed(e),
                    }
                },
                event = next_event(&mut events) => match event {
                    Some(SocketEvent::Message(text)) => {
                        let _ = self.inbound.send(text);
                        SessionAction::Idle
                    }
                    Some(SocketEvent::Error(reason)) => self.session.on_socket_error(&reason),
                    Some(SocketEvent::Closed) | None => self.session.on_closed(),
                },
                () = next_retry(&mut retry) => {
                    retry = None;
                    self.session.connect()
                },
            };

            match action {
                SessionAction::Connect => {
                    retry = None;
                    pending = Some(self.dial());
                }
                SessionAction::ScheduleRetry => {
                    debug!("reconnecting to bridge in {:?}", self.retry_delay);
                    retry = Some(Box::pin(sleep(self.retry_delay)));
                }
                SessionAction::Idle => {}
            }

            // Events of a socket the session has let go of are stale.
            if self.session.state() != ConnectionState::Open {
                events = None;
            }
            self.publish();
        }

        self.session.stop();
        self.publish();
        debug!("bridge client stopped");
    }

    fn dial(&self) -> PendingConnect {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        debug!("connecting to bridge at {url}");
        Box::pin(async move { connector.connect(&url).await })
    }

    fn publish(&self) {
        let state = self.session.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }
}

async fn next_connect(pending: &mut Option<PendingConnect>) -> Result<Connection, ConnectError> {
    match pending {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<SocketEvent>>) -> Option<SocketEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
