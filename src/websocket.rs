use crate::llm::{ CompletionClient, CompletionRequest };
use crate::models::websocket::{ ClientEvent, ServerEvent };
use chrono::Utc;
use futures::{ SinkExt, StreamExt };
use log::{ info, warn, error, debug };
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::sync::mpsc;
use tokio_tungstenite::{ tungstenite::protocol::Message, WebSocketStream };
use uuid::Uuid;

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

/// Canned reply used whenever the completion backend fails. The user
/// always gets a supportive response, never a surfaced error.
pub const FALLBACK_MESSAGE: &str =
    "I'm here to listen. Could you tell me more about how you're feeling?";

/// Registry of live connections, keyed by connection id. Entries are
/// removed on close, so a lookup doubles as the "still open" guard for
/// late completion results.
static CONNECTIONS: Lazy<Mutex<HashMap<Uuid, mpsc::UnboundedSender<Message>>>> = Lazy::new(||
    Mutex::new(HashMap::new())
);

fn register(id: Uuid, sender: mpsc::UnboundedSender<Message>) {
    CONNECTIONS.lock().unwrap().insert(id, sender);
}

fn unregister(id: &Uuid) {
    CONNECTIONS.lock().unwrap().remove(id);
}

/// Delivers an event to one connection. Returns false if the
/// connection already closed, in which case the event is discarded.
fn send_event(id: &Uuid, event: &ServerEvent) -> bool {
    let sender = match CONNECTIONS.lock().unwrap().get(id) {
        Some(sender) => sender.clone(),
        None => {
            return false;
        }
    };
    let json = serde_json::to_string(event).unwrap();
    sender.send(Message::Text(json)).is_ok()
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    completion: Arc<dyn CompletionClient>
)
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    info!("New WebSocket connection: {}", peer);

    let (mut sink, mut rx) = websocket.split();
    let connection_id = Uuid::new_v4();
    info!("Assigned connection ID {} to {}", connection_id, peer);

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    register(connection_id, out_tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = sink.send(frame).await {
                error!("Error writing to {}: {}", peer, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(message) => {
                if message.len() > MAX_MESSAGE_SIZE {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        MAX_MESSAGE_SIZE
                    );
                    break;
                }

                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(ClientEvent::ChatMessage { content, history, .. }) => {
                                if content.trim().is_empty() {
                                    debug!("Dropping empty chat_message from {}", peer);
                                    continue;
                                }
                                // The completion call is the sole suspension
                                // point; it runs detached so this loop keeps
                                // accepting further messages while it is in
                                // flight. Overlapping turns on one connection
                                // complete in whatever order the backend
                                // returns them.
                                let completion = Arc::clone(&completion);
                                tokio::spawn(async move {
                                    let request = CompletionRequest {
                                        history,
                                        message: content,
                                    };
                                    let reply = match completion.complete(&request).await {
                                        Ok(text) => text,
                                        Err(e) => {
                                            warn!(
                                                "Completion unavailable for {} ({}): {}",
                                                peer,
                                                connection_id,
                                                e
                                            );
                                            FALLBACK_MESSAGE.to_string()
                                        }
                                    };
                                    let event = ServerEvent::ChatResponse {
                                        message: reply,
                                        timestamp: Utc::now(),
                                    };
                                    if !send_event(&connection_id, &event) {
                                        debug!(
                                            "Connection {} closed before its response arrived; discarding",
                                            connection_id
                                        );
                                    }
                                });
                            }
                            Err(e) => {
                                // Malformed inbound events are dropped with
                                // no acknowledgment and the connection stays
                                // open.
                                debug!("Ignoring unparseable message from {}: {}", peer, e);
                            }
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if out_tx.send(Message::Pong(ping_data)).is_err() {
                            error!("Failed to send pong to {}", peer);
                            break;
                        }
                    }
                    Message::Pong(_) => {/* Usually ignore pongs */}
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Frame(_) => {/* Usually ignore raw frames */}
                }
            }
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        }
    }

    unregister(&connection_id);
    drop(out_tx);
    let _ = writer.await;
    info!("WebSocket connection closed for {} (ID: {})", peer, connection_id);
}
