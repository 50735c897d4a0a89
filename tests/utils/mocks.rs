#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use roomrelay::{AppError, ChatMessage, ConnectionManager, MessageStore, ParticipantId};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every payload handed to a connected participant instead of
/// writing it to a socket
#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<ParticipantId, Vec<String>>>>,
    connected: Arc<RwLock<HashMap<ParticipantId, String>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get_messages_for(&self, participant: &ParticipantId) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(participant)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes and returns the oldest message queued for a participant
    pub async fn consume_message_for(&self, participant: &ParticipantId) -> Option<String> {
        let mut sent = self.sent_messages.write().await;
        let queue = sent.get_mut(participant)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }

    pub async fn is_connected(&self, participant: &ParticipantId) -> bool {
        self.connected.read().await.contains_key(participant)
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(
        &self,
        participant: ParticipantId,
        display_name: String,
        _sender: mpsc::UnboundedSender<String>,
    ) {
        self.connected
            .write()
            .await
            .insert(participant, display_name);
    }

    async fn remove_connection(&self, participant: &ParticipantId) {
        self.connected.write().await.remove(participant);
    }

    async fn send_to_participant(&self, participant: &ParticipantId, message: &str) -> bool {
        if !self.is_connected(participant).await {
            return false;
        }
        self.sent_messages
            .write()
            .await
            .entry(*participant)
            .or_default()
            .push(message.to_string());
        true
    }

    async fn send_to_participants(&self, participants: &[ParticipantId], message: &str) -> usize {
        let unique: HashSet<&ParticipantId> = participants.iter().collect();
        let mut delivered = 0;
        for participant in unique {
            if self.send_to_participant(participant, message).await {
                delivered += 1;
            }
        }
        delivered
    }

    async fn display_name(&self, participant: &ParticipantId) -> Option<String> {
        self.connected.read().await.get(participant).cloned()
    }
}

/// Store whose writes always fail
#[derive(Default)]
pub struct FailingMessageStore {
    attempts: AtomicUsize,
}

impl FailingMessageStore {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageStore for FailingMessageStore {
    async fn store(&self, _message: &ChatMessage) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::DatabaseError("disk full".to_string()))
    }

    async fn recent(&self, _room: &str, _limit: usize) -> Result<Vec<ChatMessage>, AppError> {
        Ok(Vec::new())
    }
}
