//! Integration tests for the bridge client over a real WebSocket.
//!
//! A `tokio-tungstenite` server on `127.0.0.1` plays the Rose bridge.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use skin_monitor::application::{spawn_bridge, BridgeHandle, ConnectionState};
use skin_monitor::infrastructure::WsConnector;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

const RETRY: Duration = Duration::from_millis(100);

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client did not connect in time")
        .unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame in time")
            .expect("socket ended")
            .unwrap();
        if let Message::Text(text) = message {
            return text;
        }
    }
}

async fn wait_until(handle: &BridgeHandle, condition: impl FnMut(&ConnectionState) -> bool) {
    let mut state = handle.watch_state();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(condition))
        .await
        .expect("state not reached in time")
        .unwrap();
}

#[tokio::test]
async fn test_payloads_sent_before_bridge_is_up_arrive_in_order() {
    // Arrange: reserve a port, then free it so the first attempts are refused.
    let port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let (handle, _inbound) = spawn_bridge(format!("ws://127.0.0.1:{port}"), Arc::new(WsConnector), RETRY);

    // Act: queue while nothing listens, then bring the bridge up.
    for i in 1..=5 {
        handle.send(format!(r#"{{"skin":"Skin {i}","timestamp":{i}}}"#)).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_ne!(handle.state(), ConnectionState::Open);

    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let mut ws = accept(&listener).await;

    // Assert
    for i in 1..=5 {
        let frame: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        assert_eq!(frame["skin"], format!("Skin {i}"));
    }
    handle.stop();
}

#[tokio::test]
async fn test_inbound_frames_are_forwarded() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (handle, mut inbound) = spawn_bridge(url, Arc::new(WsConnector), RETRY);

    handle.connect();
    let mut ws = accept(&listener).await;
    ws.send(Message::Text(r#"{"type":"phase-change","phase":"Lobby"}"#.to_string()))
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame, r#"{"type":"phase-change","phase":"Lobby"}"#);
    handle.stop();
}

#[tokio::test]
async fn test_client_reconnects_after_bridge_restart() {
    // Arrange
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (handle, _inbound) = spawn_bridge(url, Arc::new(WsConnector), RETRY);
    handle.send("first").unwrap();
    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, "first");

    // Act: the bridge drops the connection.
    ws.close(None).await.unwrap();
    drop(ws);
    wait_until(&handle, |s| *s != ConnectionState::Open).await;
    handle.send("second").unwrap();

    // Assert: a new connection delivers the payload.
    let mut ws = accept(&listener).await;
    assert_eq!(next_text(&mut ws).await, "second");
    wait_until(&handle, |s| *s == ConnectionState::Open).await;
    handle.stop();
}

#[tokio::test]
async fn test_stop_closes_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (handle, mut inbound) = spawn_bridge(url, Arc::new(WsConnector), RETRY);
    handle.connect();
    let mut ws = accept(&listener).await;
    wait_until(&handle, |s| *s == ConnectionState::Open).await;

    handle.stop();

    // The server sees a close frame or the end of the stream.
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());

    // Once the client task has ended, sends are rejected.
    assert!(inbound.recv().await.is_none());
    assert!(handle.send("late").is_err());
    assert_eq!(handle.state(), ConnectionState::Disconnected);
}
