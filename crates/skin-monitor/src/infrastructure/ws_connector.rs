//! WebSocket connector for the bridge socket.
//!
//! Each connection is split into two tasks:
//!
//! - **writer**: drains an unbounded channel of outbound frames into the
//!   socket.  [`WsFrameSink`] is the sending side of that channel, which is
//!   what makes `send_frame` synchronous.
//! - **reader**: turns inbound frames into [`SocketEvent`]s.
//!
//! Both tasks end on their own when the socket closes or the sink is dropped.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::debug;

use crate::application::bridge_client::{
    BridgeError, ConnectError, Connection, Connector, FrameSink, SocketEvent,
};

/// A [`Connector`] over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ConnectError> {
        let (stream, _response) = connect_async(url).await.map_err(classify)?;
        debug!("bridge socket open: {url}");

        let (mut ws_tx, mut ws_rx) = stream.split();
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<WsMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // ── Writer ───────────────────────────────────────────────────────────
        let writer_events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = frame_rx.recv().await {
                let closing = matches!(message, WsMessage::Close(_));
                if let Err(e) = ws_tx.send(message).await {
                    let _ = writer_events.send(SocketEvent::Error(e.to_string()));
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // ── Reader ───────────────────────────────────────────────────────────
        tokio::spawn(async move {
            loop {
                let event = match ws_rx.next().await {
                    Some(Ok(WsMessage::Text(text))) => SocketEvent::Message(text),
                    Some(Ok(WsMessage::Close(_))) | None => SocketEvent::Closed,
                    Some(Ok(_)) => continue,
                    Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => SocketEvent::Closed,
                    Some(Err(e)) => SocketEvent::Error(e.to_string()),
                };
                let terminal = !matches!(event, SocketEvent::Message(_));
                if event_tx.send(event).is_err() || terminal {
                    break;
                }
            }
        });

        Ok(Connection {
            sink: Box::new(WsFrameSink {
                frames: Some(frame_tx),
            }),
            events: event_rx,
        })
    }
}

/// Setup failures are errors in the request itself; everything else happened
/// on the wire.
fn classify(error: WsError) -> ConnectError {
    match error {
        WsError::Url(_) | WsError::HttpFormat(_) => ConnectError::Setup(error.to_string()),
        other => ConnectError::Socket(other.to_string()),
    }
}

/// The sending side of an open bridge socket.
pub struct WsFrameSink {
    frames: Option<mpsc::UnboundedSender<WsMessage>>,
}

impl FrameSink for WsFrameSink {
    fn send_frame(&mut self, frame: &str) -> Result<(), BridgeError> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| BridgeError::Send("socket is closed".to_string()))?;
        frames
            .send(WsMessage::Text(frame.to_string()))
            .map_err(|_| BridgeError::Send("socket writer has stopped".to_string()))
    }

    fn close(&mut self) {
        if let Some(frames) = self.frames.take() {
            let _ = frames.send(WsMessage::Close(None));
        }
    }
}
