//! WebSocket Handler
//!
//! Upgrades viewer connections and bridges them to the hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use bytes::Bytes;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::consumer::{ChannelConsumer, Consumer};
use super::hub::Hub;
use crate::api::AppState;

/// WebSocket upgrade handler for `/map/ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = state.hub.clone();
    let capacity = state.queue_capacity;
    ws.on_upgrade(move |socket| handle_socket(socket, peer, hub, capacity))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, peer: SocketAddr, hub: Hub, capacity: usize) {
    let (sender, receiver) = socket.split();

    let (consumer, queue) = ChannelConsumer::new(peer.to_string(), capacity);
    let id = consumer.id();

    if hub.register(consumer).await.is_err() {
        tracing::error!(peer = %peer, "Hub stopped, rejecting viewer");
        return;
    }

    let mut send_task = tokio::spawn(forward_frames(queue, sender, peer));
    let mut recv_task = tokio::spawn(discard_incoming(receiver, peer));

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    // No-op if the hub already dropped this viewer
    let _ = hub.unregister(id).await;
}

/// Write queued frames to the socket until the hub closes the queue
async fn forward_frames(
    mut queue: mpsc::Receiver<Bytes>,
    mut sender: SplitSink<WebSocket, Message>,
    peer: SocketAddr,
) {
    while let Some(frame) = queue.recv().await {
        if sender.send(Message::Binary(frame.to_vec())).await.is_err() {
            tracing::debug!(peer = %peer, "WebSocket send failed, closing connection");
            return;
        }
    }

    tracing::debug!(peer = %peer, "Outbound queue closed by hub");
    let _ = sender.send(Message::Close(None)).await;
}

/// Read and ignore viewer traffic until the viewer goes away
async fn discard_incoming(mut receiver: SplitStream<WebSocket>, peer: SocketAddr) {
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                tracing::debug!(peer = %peer, "Viewer requested close");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "WebSocket receive error");
                return;
            }
        }
    }
}
