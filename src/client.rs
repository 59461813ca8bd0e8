use crate::models::chat::{ transcript_window, ChatMessage, Sender, HISTORY_WINDOW };
use crate::models::websocket::{ ClientEvent, ServerEvent };
use chrono::Utc;
use futures::{ SinkExt, StreamExt };
use log::{ info, warn, debug };
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration;
use tokio::sync::{ mpsc, Mutex, Notify };
use tokio_tungstenite::{ connect_async, tungstenite::protocol::Message };

/// Fixed delay before each reconnection attempt. One attempt per
/// close, forever, at this cadence.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Delay before the local connectivity fallback is appended when a
/// message is sent while the channel is down.
pub const OFFLINE_FALLBACK_DELAY: Duration = Duration::from_millis(1500);

pub const OFFLINE_FALLBACK_MESSAGE: &str =
    "I'm having trouble connecting to the support service. Please try again in a moment.";

/// Relay endpoint for a given host, with the scheme chosen by whether
/// the hosting page travels over a secure transport.
pub fn relay_url(host: &str, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!("{}://{}/ws", scheme, host)
}

/// Client-side chat session. Keeps the local conversation buffer,
/// relays sends over a WebSocket channel, and re-establishes the
/// channel after every close. The server holds no state for this
/// session; the history window is resent with every message.
pub struct ChatSession {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    connected: Arc<AtomicBool>,
    typing: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<Message>,
    reconnect_nudge: Arc<Notify>,
    offline_fallback_delay: Duration,
}

impl ChatSession {
    pub fn connect(url: impl Into<String>) -> Self {
        Self::with_delays(url, RECONNECT_DELAY, OFFLINE_FALLBACK_DELAY)
    }

    pub fn with_delays(
        url: impl Into<String>,
        reconnect_delay: Duration,
        offline_fallback_delay: Duration
    ) -> Self {
        let url = url.into();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let connected = Arc::new(AtomicBool::new(false));
        let typing = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let reconnect_nudge = Arc::new(Notify::new());
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(
            run_channel(
                url,
                reconnect_delay,
                outbound_rx,
                Arc::clone(&messages),
                Arc::clone(&connected),
                Arc::clone(&typing),
                Arc::clone(&stopped),
                Arc::clone(&reconnect_nudge)
            )
        );

        Self {
            messages,
            connected,
            typing,
            stopped,
            outbound,
            reconnect_nudge,
            offline_fallback_delay,
        }
    }

    /// Appends the user message to the local buffer immediately (the
    /// echo is never rolled back), then transmits it if the channel is
    /// open. While disconnected, a local connectivity fallback is
    /// appended after a fixed delay instead, and the reconnect loop is
    /// woken to reopen the channel ahead of its fixed cadence.
    pub async fn send(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        // The window is computed before the echo is appended, so it
        // covers only prior turns.
        let history = {
            let buffer = self.messages.lock().await;
            transcript_window(&buffer, HISTORY_WINDOW)
        };
        self.messages.lock().await.push(ChatMessage::now(Sender::User, text));
        self.typing.store(true, Ordering::SeqCst);

        if self.connected.load(Ordering::SeqCst) {
            let event = ClientEvent::ChatMessage {
                content: text.to_string(),
                history,
                timestamp: Some(Utc::now()),
            };
            let json = serde_json::to_string(&event).unwrap();
            if self.outbound.send(Message::Text(json)).is_err() {
                warn!("Chat session already closed; message not transmitted");
            }
        } else {
            let messages = Arc::clone(&self.messages);
            let typing = Arc::clone(&self.typing);
            let nudge = Arc::clone(&self.reconnect_nudge);
            let delay = self.offline_fallback_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                messages
                    .lock().await
                    .push(ChatMessage::now(Sender::Assistant, OFFLINE_FALLBACK_MESSAGE));
                typing.store(false, Ordering::SeqCst);
                nudge.notify_one();
            });
        }
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    /// Closes the channel. No further reconnection attempts are made.
    pub fn close(self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

async fn run_channel(
    url: String,
    reconnect_delay: Duration,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    connected: Arc<AtomicBool>,
    typing: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    nudge: Arc<Notify>
) {
    loop {
        if stopped.load(Ordering::SeqCst) {
            break;
        }

        match connect_async(&url).await {
            Ok((ws, _)) => {
                info!("Chat channel established to {}", url);
                connected.store(true, Ordering::SeqCst);
                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        out = outbound.recv() => {
                            match out {
                                Some(frame) => {
                                    if write.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                None => {
                                    stopped.store(true, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                        inbound = read.next() => {
                            match inbound {
                                Some(Ok(Message::Text(text))) => {
                                    handle_inbound(&text, &messages, &typing).await;
                                }
                                Some(Ok(Message::Ping(data))) => {
                                    let _ = write.send(Message::Pong(data)).await;
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!("Chat channel read error: {}", e);
                                    break;
                                }
                            }
                        }
                    }
                }

                connected.store(false, Ordering::SeqCst);
                info!("Chat channel closed");
            }
            Err(e) => {
                warn!("Chat channel connect failed: {}", e);
            }
        }

        if stopped.load(Ordering::SeqCst) {
            break;
        }
        // Exactly one attempt per close, at a fixed cadence, unless an
        // offline send asks for the channel sooner.
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = nudge.notified() => {}
        }
    }
}

async fn handle_inbound(
    text: &str,
    messages: &Arc<Mutex<Vec<ChatMessage>>>,
    typing: &Arc<AtomicBool>
) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::ChatResponse { message, timestamp }) => {
            messages.lock().await.push(ChatMessage {
                sender: Sender::Assistant,
                text: message,
                timestamp,
            });
            typing.store(false, Ordering::SeqCst);
        }
        Err(e) => {
            debug!("Ignoring unparseable relay event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_url_follows_page_transport() {
        assert_eq!(relay_url("care.example.org", true), "wss://care.example.org/ws");
        assert_eq!(relay_url("localhost:4000", false), "ws://localhost:4000/ws");
    }
}
