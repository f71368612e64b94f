//! Round-trip tests for the WebSocket transport over a real socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tricard_transport::{Connection, Transport, WebSocketTransport};

async fn bound() -> (WebSocketTransport, String) {
    let transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
    let addr = transport.local_addr().expect("local addr").to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_text_frames_round_trip() {
    let (mut transport, addr) = bound().await;
    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("connect");
        ws.send(Message::Text("JOIN;Room_1".into())).await.expect("send");
        let reply = ws.next().await.expect("frame").expect("ok");
        reply.into_text().expect("text").as_str().to_owned()
    });

    let conn = transport.accept().await.expect("accept");
    assert_eq!(conn.recv().await.expect("recv").as_deref(), Some("JOIN;Room_1"));
    conn.send("JOIN_OK;Room_1").await.expect("send");

    assert_eq!(client.await.expect("client task"), "JOIN_OK;Room_1");
}

#[tokio::test]
async fn test_send_is_not_blocked_by_pending_recv() {
    let (mut transport, addr) = bound().await;
    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("connect");
        let frame = ws.next().await.expect("frame").expect("ok");
        frame.into_text().expect("text").as_str().to_owned()
    });

    let conn = Arc::new(transport.accept().await.expect("accept"));
    let reader = Arc::clone(&conn);
    let pending = tokio::spawn(async move { reader.recv().await });

    // The reader now holds the stream half; the sink must stay usable.
    tokio::time::sleep(Duration::from_millis(20)).await;
    tokio::time::timeout(Duration::from_secs(2), conn.send("YOUR_TURN"))
        .await
        .expect("send must not wait for recv")
        .expect("send");

    assert_eq!(client.await.expect("client task"), "YOUR_TURN");
    // Client dropped: the pending recv resolves to a close or an error.
    let _ = pending.await;
}

#[tokio::test]
async fn test_close_ends_peer_stream() {
    let (mut transport, addr) = bound().await;
    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("connect");
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => continue,
            }
        }
    });

    let conn = transport.accept().await.expect("accept");
    conn.close().await.expect("close");
    assert!(client.await.expect("client task"));
}
