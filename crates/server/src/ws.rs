//! Progress WebSocket.
//!
//! On connect the client is told its id (`client_id:<id>`); afterwards it
//! receives `log:<line>` messages for jobs submitted with that id. Sending
//! the text `close` ends the session.

use crate::registry::Registry;
use crate::routes::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};

pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state.registry))
}

async fn session(socket: WebSocket, registry: Registry) {
    let (id, mut outgoing) = registry.register();
    info!(client_id = %id, "WebSocket connection opened");

    let (mut sink, mut stream) = socket.split();
    if sink.send(Message::Text(format!("client_id:{id}"))).await.is_err() {
        registry.unregister(&id);
        return;
    }

    // Ends once the registry drops this session's sender
    let forward = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) if text == "close" => break,
            Message::Text(text) => debug!(client_id = %id, "ignoring client message {text:?}"),
            Message::Close(_) => break,
            _ => {}
        }
    }

    registry.unregister(&id);
    let _ = forward.await;
    info!(client_id = %id, "WebSocket connection closed");
}
