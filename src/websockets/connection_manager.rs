use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::participant::ParticipantId;

#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(
        &self,
        participant: ParticipantId,
        display_name: String,
        sender: mpsc::UnboundedSender<String>,
    );

    async fn remove_connection(&self, participant: &ParticipantId);

    /// Hands a payload to the participant's outbound channel. Returns false
    /// when the participant is not connected.
    async fn send_to_participant(&self, participant: &ParticipantId, message: &str) -> bool;

    /// Returns the number of participants the payload was handed to
    async fn send_to_participants(&self, participants: &[ParticipantId], message: &str) -> usize;

    async fn display_name(&self, participant: &ParticipantId) -> Option<String>;
}

struct ConnectionEntry {
    display_name: String,
    sender: mpsc::UnboundedSender<String>,
}

pub struct InMemoryConnectionManager {
    // participant -> outbound channel
    connections: Arc<RwLock<HashMap<ParticipantId, ConnectionEntry>>>,
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(
        &self,
        participant: ParticipantId,
        display_name: String,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let mut connections = self.connections.write().await;
        connections.insert(
            participant,
            ConnectionEntry {
                display_name,
                sender,
            },
        );
    }

    async fn remove_connection(&self, participant: &ParticipantId) {
        let mut connections = self.connections.write().await;
        connections.remove(participant);
    }

    async fn send_to_participant(&self, participant: &ParticipantId, message: &str) -> bool {
        let connections = self.connections.read().await;
        match connections.get(participant) {
            Some(entry) => entry.sender.send(message.to_string()).is_ok(),
            None => false,
        }
    }

    async fn send_to_participants(&self, participants: &[ParticipantId], message: &str) -> usize {
        let connections = self.connections.read().await;
        participants
            .iter()
            .filter_map(|participant| connections.get(participant))
            .filter(|entry| entry.sender.send(message.to_string()).is_ok())
            .count()
    }

    async fn display_name(&self, participant: &ParticipantId) -> Option<String> {
        let connections = self.connections.read().await;
        connections
            .get(participant)
            .map(|entry| entry.display_name.clone())
    }
}
