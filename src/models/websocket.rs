use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "chat_message")] ChatMessage {
        content: String,
        #[serde(default)]
        history: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "chat_response")] ChatResponse {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_parses_wire_shape() {
        let json =
            r#"{"type":"chat_message","content":"hello","history":"User: hi","timestamp":"2024-04-02T10:00:00Z"}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        let ClientEvent::ChatMessage { content, history, timestamp } = event;
        assert_eq!(content, "hello");
        assert_eq!(history, "User: hi");
        assert!(timestamp.is_some());
    }

    #[test]
    fn chat_message_history_defaults_to_empty() {
        let json = r#"{"type":"chat_message","content":"hello"}"#;
        let ClientEvent::ChatMessage { history, .. } = serde_json::from_str(json).unwrap();
        assert_eq!(history, "");
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let json = r#"{"type":"not_a_real_type","content":"hello"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn missing_content_is_rejected() {
        let json = r#"{"type":"chat_message","history":""}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn chat_response_serializes_with_tag() {
        let event = ServerEvent::ChatResponse {
            message: "take a slow breath".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chat_response""#));
        assert!(json.contains(r#""message":"take a slow breath""#));
    }
}
