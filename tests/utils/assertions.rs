//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use roomrelay::{MessageType, ParticipantId, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    participants: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for specific participants (by display name)
    pub fn for_participants(setup: &'a TestSetup, participants: Vec<&'a str>) -> Self {
        Self {
            setup,
            participants,
        }
    }

    /// Assert that participants received a specific message type (consumes the message from queue)
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for name in &self.participants {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(&self.setup.id(name))
                .await;
            assert!(message.is_some(), "{} should have received a message", name);

            let msg: WebSocketMessage = serde_json::from_str(&message.unwrap()).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                name
            );
            messages.push(msg);
        }

        // Fan-out sends one serialized payload, so every recipient sees the same bytes
        if messages.len() > 1 {
            let first_payload = &messages[0].payload;
            for (i, msg) in messages.iter().enumerate().skip(1) {
                assert_eq!(
                    &msg.payload, first_payload,
                    "{} payload differs from {}",
                    self.participants[i], self.participants[0]
                );
            }
        }

        MessageContent {
            payload: messages[0].payload.clone(),
        }
    }

    /// Assert that participants received no messages
    pub async fn received_no_messages(self) {
        for name in &self.participants {
            let messages = self
                .setup
                .mock_conn_manager
                .get_messages_for(&self.setup.id(name))
                .await;
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                name,
                messages
            );
        }
    }

    /// Count how many messages of a specific type a participant received (non-consuming)
    pub async fn count_message_type(&self, name: &str, msg_type: MessageType) -> usize {
        let messages = self
            .setup
            .mock_conn_manager
            .get_messages_for(&self.setup.id(name))
            .await;
        messages
            .iter()
            .filter_map(|raw| serde_json::from_str::<WebSocketMessage>(raw).ok())
            .filter(|msg| msg.message_type == msg_type)
            .count()
    }
}

// ============================================================================
// Message Content Assertions
// ============================================================================

pub struct MessageContent {
    payload: serde_json::Value,
}

impl MessageContent {
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Assert the message was sent by a specific participant
    pub fn with_sender(self, expected_sender: ParticipantId) -> Self {
        assert_eq!(self.payload["sender"], expected_sender.to_string());
        self
    }

    /// Assert the message has specific content
    pub fn with_content(self, expected_content: &str) -> Self {
        assert_eq!(self.payload["content"], expected_content);
        self
    }

    /// Assert the message concerns a specific room
    pub fn with_room(self, expected_room: &str) -> Self {
        assert_eq!(self.payload["room"], expected_room);
        self
    }

    /// Assert a presence message is about a specific member
    pub fn with_member(self, expected_member: ParticipantId, expected_name: &str) -> Self {
        assert_eq!(
            self.payload["member"]["participant_id"],
            expected_member.to_string()
        );
        assert_eq!(self.payload["member"]["display_name"], expected_name);
        self
    }
}
