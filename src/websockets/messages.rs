use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::message::ChatMessage;
use crate::participant::ParticipantId;

/// Message types for WebSocket communication
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // Client -> Server
    Join,
    Leave,
    Notify,

    // Both directions
    Chat,

    // Server -> Client
    Welcome,
    RoomMembers,
    MemberJoined,
    MemberLeft,
    History,
    Notification,
    Error,
}

/// Metadata for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessageMeta {
    pub timestamp: DateTime<Utc>,
    pub participant_id: Option<ParticipantId>,
}

/// Base structure for WebSocket messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub meta: Option<WebSocketMessageMeta>,
}

/// Client-to-Server message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendChatPayload {
    pub room: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyPayload {
    pub recipient: ParticipantId,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Server-to-Client message payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomePayload {
    pub participant_id: ParticipantId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberInfo {
    pub participant_id: ParticipantId,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMembersPayload {
    pub room: String,
    pub members: Vec<MemberInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEventPayload {
    pub room: String,
    pub member: MemberInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPayload {
    pub id: uuid::Uuid,
    pub room: String,
    pub sender: ParticipantId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatPayload {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            room: message.room.clone(),
            sender: message.sender,
            content: message.body.clone(),
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPayload {
    pub room: String,
    pub messages: Vec<ChatPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub sender: ParticipantId,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Helper functions for creating messages
impl WebSocketMessage {
    pub fn new(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            payload,
            meta: Some(WebSocketMessageMeta {
                timestamp: Utc::now(),
                participant_id: None,
            }),
        }
    }

    fn with_payload<T: Serialize>(
        message_type: MessageType,
        payload: T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(message_type, serde_json::to_value(payload)?))
    }

    /// Attributes the message to a participant in its metadata
    pub fn attributed_to(mut self, participant: ParticipantId) -> Self {
        let meta = self.meta.get_or_insert_with(|| WebSocketMessageMeta {
            timestamp: Utc::now(),
            participant_id: None,
        });
        meta.participant_id = Some(participant);
        self
    }

    /// Decodes the payload into the type expected for this message
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Create a JOIN message
    pub fn join(room: String) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::Join, RoomPayload { room })
    }

    /// Create a LEAVE message
    pub fn leave(room: String) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::Leave, RoomPayload { room })
    }

    /// Create a client CHAT message
    pub fn send_chat(room: String, content: String) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::Chat, SendChatPayload { room, content })
    }

    /// Create a NOTIFY message
    pub fn notify(
        recipient: ParticipantId,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::Notify, NotifyPayload { recipient, payload })
    }

    /// Create a WELCOME message
    pub fn welcome(
        participant_id: ParticipantId,
        display_name: String,
    ) -> Result<Self, serde_json::Error> {
        Self::with_payload(
            MessageType::Welcome,
            WelcomePayload {
                participant_id,
                display_name,
            },
        )
    }

    /// Create a ROOM_MEMBERS message
    pub fn room_members(
        room: String,
        members: Vec<MemberInfo>,
    ) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::RoomMembers, RoomMembersPayload { room, members })
    }

    /// Create a MEMBER_JOINED message
    pub fn member_joined(room: String, member: MemberInfo) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::MemberJoined, MemberEventPayload { room, member })
    }

    /// Create a MEMBER_LEFT message
    pub fn member_left(room: String, member: MemberInfo) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::MemberLeft, MemberEventPayload { room, member })
    }

    /// Create a server CHAT message for a relayed message
    pub fn chat(message: &ChatMessage) -> Result<Self, serde_json::Error> {
        Ok(Self::with_payload(MessageType::Chat, ChatPayload::from(message))?
            .attributed_to(message.sender))
    }

    /// Create a HISTORY message
    pub fn history(room: String, messages: &[ChatMessage]) -> Result<Self, serde_json::Error> {
        let messages = messages.iter().map(ChatPayload::from).collect();
        Self::with_payload(MessageType::History, HistoryPayload { room, messages })
    }

    /// Create a NOTIFICATION message
    pub fn notification(
        sender: ParticipantId,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(
            Self::with_payload(MessageType::Notification, NotificationPayload { sender, payload })?
                .attributed_to(sender),
        )
    }

    /// Create an ERROR message
    pub fn error(message: String) -> Result<Self, serde_json::Error> {
        Self::with_payload(MessageType::Error, ErrorPayload { message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_wire_names() {
        assert_eq!(
            serde_json::to_value(MessageType::RoomMembers).unwrap(),
            json!("ROOM_MEMBERS")
        );
        assert_eq!(
            serde_json::to_value(MessageType::MemberJoined).unwrap(),
            json!("MEMBER_JOINED")
        );
        assert_eq!(serde_json::to_value(MessageType::Chat).unwrap(), json!("CHAT"));
    }

    #[test]
    fn test_client_message_without_meta_parses() {
        let raw = r#"{"type":"CHAT","payload":{"room":"lobby","content":"hi"}}"#;
        let msg: WebSocketMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.message_type, MessageType::Chat);
        assert!(msg.meta.is_none());

        let payload: SendChatPayload = msg.parse_payload().unwrap();
        assert_eq!(payload.room, "lobby");
        assert_eq!(payload.content, "hi");
    }

    #[test]
    fn test_missing_payload_fails_to_parse_as_room() {
        let raw = r#"{"type":"JOIN"}"#;
        let msg: WebSocketMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.parse_payload::<RoomPayload>().is_err());
    }

    #[test]
    fn test_chat_message_carries_sender_in_payload_and_meta() {
        let sender = ParticipantId::new();
        let message = ChatMessage::new(sender, "lobby", "hello");

        let ws = WebSocketMessage::chat(&message).unwrap();
        assert_eq!(ws.message_type, MessageType::Chat);
        assert_eq!(ws.meta.as_ref().unwrap().participant_id, Some(sender));

        let payload: ChatPayload = ws.parse_payload().unwrap();
        assert_eq!(payload, ChatPayload::from(&message));
        assert_eq!(payload.content, "hello");
    }

    #[test]
    fn test_notify_round_trips_recipient() {
        let recipient = ParticipantId::new();
        let ws = WebSocketMessage::notify(recipient, json!({"kind": "dm"})).unwrap();
        let text = serde_json::to_string(&ws).unwrap();

        let back: WebSocketMessage = serde_json::from_str(&text).unwrap();
        let payload: NotifyPayload = back.parse_payload().unwrap();
        assert_eq!(payload.recipient, recipient);
        assert_eq!(payload.payload, json!({"kind": "dm"}));
    }

    #[test]
    fn test_history_preserves_order() {
        let sender = ParticipantId::new();
        let messages = vec![
            ChatMessage::new(sender, "lobby", "first"),
            ChatMessage::new(sender, "lobby", "second"),
        ];

        let ws = WebSocketMessage::history("lobby".into(), &messages).unwrap();
        let payload: HistoryPayload = ws.parse_payload().unwrap();
        let contents: Vec<&str> = payload.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}
