use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participant::ParticipantId;

/// A chat message as relayed and persisted
///
/// Built once by the relay when a send request arrives and never mutated
/// afterwards; the store and the fan-out each get their own view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: ParticipantId,
    pub room: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message with a server-assigned id and timestamp
    pub fn new(sender: ParticipantId, room: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            room: room.into(),
            body: body.into(),
            sent_at: Utc::now(),
        }
    }
}
