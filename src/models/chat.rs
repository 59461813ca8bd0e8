use chrono::{ DateTime, Utc };

/// Number of recent messages flattened into the transcript sent with
/// every completion request. The relay itself is stateless; the client
/// resends this window on each turn.
pub const HISTORY_WINDOW: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Assistant => "Assistant",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn now(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Flattens the last `window` messages into `"User: ...\nAssistant: ..."`
/// lines, oldest first.
pub fn transcript_window(messages: &[ChatMessage], window: usize) -> String {
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| format!("{}: {}", m.sender.label(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(texts: &[(Sender, &str)]) -> Vec<ChatMessage> {
        texts
            .iter()
            .map(|(sender, text)| ChatMessage::now(*sender, *text))
            .collect()
    }

    #[test]
    fn window_keeps_only_the_most_recent_messages() {
        let messages = buffer(
            &[
                (Sender::User, "one"),
                (Sender::Assistant, "two"),
                (Sender::User, "three"),
                (Sender::Assistant, "four"),
                (Sender::User, "five"),
                (Sender::Assistant, "six"),
                (Sender::User, "seven"),
                (Sender::Assistant, "eight"),
            ]
        );

        let transcript = transcript_window(&messages, HISTORY_WINDOW);
        assert_eq!(
            transcript,
            "Assistant: four\nUser: five\nAssistant: six\nUser: seven\nAssistant: eight"
        );
    }

    #[test]
    fn window_larger_than_buffer_takes_everything() {
        let messages = buffer(&[(Sender::User, "hi"), (Sender::Assistant, "hello")]);
        assert_eq!(transcript_window(&messages, 5), "User: hi\nAssistant: hello");
    }

    #[test]
    fn empty_buffer_yields_empty_transcript() {
        assert_eq!(transcript_window(&[], HISTORY_WINDOW), "");
    }
}
