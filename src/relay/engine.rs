use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    message::{ChatMessage, MessageStore},
    participant::ParticipantId,
    room::{registry::RoomRegistry, JoinResult, LeaveResult},
    shared::AppError,
    websockets::{
        messages::{MemberInfo, WebSocketMessage},
        ConnectionManager,
    },
};

/// What happened to a chat message handed to [`RelayEngine::send`]
pub struct SendReceipt {
    pub message: ChatMessage,
    /// Members of the room other than the sender at fan-out time
    pub recipients: usize,
    /// Recipients whose connection accepted the payload
    pub delivered: usize,
    /// Background store call; dropping it does not cancel the write
    pub persistence: JoinHandle<Result<(), AppError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// Recipient has no live connection; the notification is discarded
    RecipientOffline,
}

/// Relays chat traffic between participants
///
/// Owns the connection lifecycle (connect, join/leave, disconnect), fans room
/// messages out to the other members and hands every message to the store
/// without waiting for it.
pub struct RelayEngine {
    room_registry: Arc<dyn RoomRegistry>,
    message_store: Arc<dyn MessageStore>,
    connection_manager: Arc<dyn ConnectionManager>,
    history_limit: usize,
}

impl RelayEngine {
    pub fn new(
        room_registry: Arc<dyn RoomRegistry>,
        message_store: Arc<dyn MessageStore>,
        connection_manager: Arc<dyn ConnectionManager>,
        history_limit: usize,
    ) -> Self {
        Self {
            room_registry,
            message_store,
            connection_manager,
            history_limit,
        }
    }

    /// Registers a freshly accepted connection and greets it
    #[instrument(skip(self, sender), fields(participant_id = %participant))]
    pub async fn connect(
        &self,
        participant: ParticipantId,
        display_name: String,
        sender: mpsc::UnboundedSender<String>,
    ) {
        self.connection_manager
            .add_connection(participant, display_name.clone(), sender)
            .await;

        info!(display_name = %display_name, "Participant connected");

        self.deliver_to(participant, WebSocketMessage::welcome(participant, display_name))
            .await;
    }

    #[instrument(skip(self), fields(participant_id = %participant))]
    pub async fn join(&self, participant: ParticipantId, room: &str) -> JoinResult {
        let result = self.room_registry.join(participant, room).await;

        let members = self.room_registry.members_of(room).await;
        let member_infos = self.member_infos(&members).await;
        self.deliver_to(
            participant,
            WebSocketMessage::room_members(room.to_string(), member_infos),
        )
        .await;

        if result.is_new_member() {
            let others: Vec<ParticipantId> = members
                .into_iter()
                .filter(|member| *member != participant)
                .collect();
            let joined = self.member_info(participant).await;
            self.broadcast(
                &others,
                WebSocketMessage::member_joined(room.to_string(), joined),
            )
            .await;

            self.replay_history(participant, room).await;
        }

        result
    }

    #[instrument(skip(self), fields(participant_id = %participant))]
    pub async fn leave(&self, participant: ParticipantId, room: &str) -> LeaveResult {
        let result = self.room_registry.leave(participant, room).await;

        if let LeaveResult::Left { .. } = result {
            self.announce_departure(participant, room).await;
        }

        result
    }

    /// Tears down a connection: removes the participant from every room,
    /// tells the remaining members and drops the outbound channel
    #[instrument(skip(self), fields(participant_id = %participant))]
    pub async fn disconnect(&self, participant: ParticipantId) -> Vec<String> {
        let rooms = self.room_registry.leave_all(participant).await;

        for room in &rooms {
            self.announce_departure(participant, room).await;
        }

        self.connection_manager.remove_connection(&participant).await;

        info!(rooms_left = rooms.len(), "Participant disconnected");
        rooms
    }

    /// Relays a chat message to every other member of the room
    ///
    /// The store call is spawned before fan-out and never awaited here, so a
    /// slow or failing store cannot hold up delivery. The sender does not need
    /// to be a member of the room.
    #[instrument(skip(self, body), fields(participant_id = %sender))]
    pub async fn send(&self, sender: ParticipantId, room: &str, body: &str) -> SendReceipt {
        let message = ChatMessage::new(sender, room, body);
        let persistence = self.spawn_persist(message.clone());

        let recipients = self.room_registry.members_except(room, sender).await;
        let delivered = self
            .broadcast(&recipients, WebSocketMessage::chat(&message))
            .await;

        debug!(
            message_id = %message.id,
            recipients = recipients.len(),
            delivered,
            "Chat message relayed"
        );

        SendReceipt {
            message,
            recipients: recipients.len(),
            delivered,
            persistence,
        }
    }

    /// Delivers an out-of-band notification to exactly one participant
    #[instrument(skip(self, payload), fields(participant_id = %sender))]
    pub async fn notify(
        &self,
        sender: ParticipantId,
        recipient: ParticipantId,
        payload: serde_json::Value,
    ) -> NotifyOutcome {
        if self
            .deliver_to(recipient, WebSocketMessage::notification(sender, payload))
            .await
        {
            NotifyOutcome::Delivered
        } else {
            debug!("Notification dropped, recipient not connected");
            NotifyOutcome::RecipientOffline
        }
    }

    /// Sends an ERROR message to one participant
    pub async fn send_error(&self, participant: ParticipantId, reason: impl Into<String>) -> bool {
        self.deliver_to(participant, WebSocketMessage::error(reason.into()))
            .await
    }

    fn spawn_persist(&self, message: ChatMessage) -> JoinHandle<Result<(), AppError>> {
        let store = Arc::clone(&self.message_store);
        tokio::spawn(async move {
            let result = store.store(&message).await;
            if let Err(e) = &result {
                error!(
                    message_id = %message.id,
                    room = %message.room,
                    error = %e,
                    "Failed to persist message, delivery unaffected"
                );
            }
            result
        })
    }

    async fn replay_history(&self, participant: ParticipantId, room: &str) {
        if self.history_limit == 0 {
            return;
        }

        match self.message_store.recent(room, self.history_limit).await {
            Ok(messages) if messages.is_empty() => {}
            Ok(messages) => {
                self.deliver_to(
                    participant,
                    WebSocketMessage::history(room.to_string(), &messages),
                )
                .await;
            }
            Err(e) => {
                warn!(room = %room, error = %e, "Failed to load room history");
            }
        }
    }

    async fn announce_departure(&self, participant: ParticipantId, room: &str) {
        let remaining = self.room_registry.members_of(room).await;
        if remaining.is_empty() {
            return;
        }
        let left = self.member_info(participant).await;
        self.broadcast(&remaining, WebSocketMessage::member_left(room.to_string(), left))
            .await;
    }

    async fn member_info(&self, participant: ParticipantId) -> MemberInfo {
        MemberInfo {
            participant_id: participant,
            display_name: self.connection_manager.display_name(&participant).await,
        }
    }

    async fn member_infos(&self, participants: &[ParticipantId]) -> Vec<MemberInfo> {
        let mut infos = Vec::with_capacity(participants.len());
        for participant in participants {
            infos.push(self.member_info(*participant).await);
        }
        infos
    }

    async fn deliver_to(
        &self,
        participant: ParticipantId,
        message: Result<WebSocketMessage, serde_json::Error>,
    ) -> bool {
        match encode(message) {
            Some(json) => {
                self.connection_manager
                    .send_to_participant(&participant, &json)
                    .await
            }
            None => false,
        }
    }

    async fn broadcast(
        &self,
        participants: &[ParticipantId],
        message: Result<WebSocketMessage, serde_json::Error>,
    ) -> usize {
        if participants.is_empty() {
            return 0;
        }
        match encode(message) {
            Some(json) => {
                self.connection_manager
                    .send_to_participants(participants, &json)
                    .await
            }
            None => 0,
        }
    }
}

fn encode(message: Result<WebSocketMessage, serde_json::Error>) -> Option<String> {
    match message.and_then(|message| serde_json::to_string(&message)) {
        Ok(json) => Some(json),
        Err(e) => {
            error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}
