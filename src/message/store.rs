use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::ChatMessage;
use crate::shared::AppError;

/// Persistence collaborator for relayed messages
///
/// The relay calls `store` at most once per message and never retries.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn store(&self, message: &ChatMessage) -> Result<(), AppError>;

    /// Most recent messages of a room, oldest first
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>, AppError>;
}

/// Messages kept per room by [`InMemoryMessageStore::new`]
pub const DEFAULT_ROOM_CAPACITY: usize = 1000;

/// In-memory implementation of MessageStore for development and testing
///
/// Keeps at most `room_capacity` messages per room, dropping the oldest.
/// Data is lost when the application restarts.
pub struct InMemoryMessageStore {
    rooms: RwLock<HashMap<String, VecDeque<ChatMessage>>>,
    room_capacity: usize,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::with_room_capacity(DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_room_capacity(room_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            room_capacity,
        }
    }

    /// Returns the current number of stored messages across all rooms
    pub async fn message_count(&self) -> usize {
        self.rooms.read().await.values().map(VecDeque::len).sum()
    }

    /// Snapshot of everything still held, ordered by send time
    pub async fn messages(&self) -> Vec<ChatMessage> {
        let rooms = self.rooms.read().await;
        let mut messages: Vec<ChatMessage> = rooms.values().flatten().cloned().collect();
        messages.sort_by_key(|m| m.sent_at);
        messages
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    #[instrument(skip(self, message), fields(message_id = %message.id, room = %message.room))]
    async fn store(&self, message: &ChatMessage) -> Result<(), AppError> {
        let mut rooms = self.rooms.write().await;
        let history = rooms.entry(message.room.clone()).or_default();
        history.push_back(message.clone());
        while history.len() > self.room_capacity {
            history.pop_front();
        }
        debug!(held = history.len(), "Message stored in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>, AppError> {
        let rooms = self.rooms.read().await;
        let Some(history) = rooms.get(room) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(limit);
        Ok(history.iter().skip(skip).cloned().collect())
    }
}

/// PostgreSQL implementation of MessageStore
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the messages table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id UUID PRIMARY KEY,
                room TEXT NOT NULL,
                sender UUID NOT NULL,
                body TEXT NOT NULL,
                sent_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS chat_messages_room_sent_at ON chat_messages (room, sent_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    #[instrument(skip(self, message), fields(message_id = %message.id, room = %message.room))]
    async fn store(&self, message: &ChatMessage) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO chat_messages (id, room, sender, body, sent_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(message.id)
        .bind(&message.room)
        .bind(message.sender.as_uuid())
        .bind(&message.body)
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store message in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!("Message stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query(
            "SELECT id, room, sender, body, sent_at FROM chat_messages
             WHERE room = $1 ORDER BY sent_at DESC LIMIT $2",
        )
        .bind(room)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room = %room, "Failed to fetch room history from database");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut messages = rows
            .into_iter()
            .map(|row| -> Result<ChatMessage, sqlx::Error> {
                Ok(ChatMessage {
                    id: row.try_get("id")?,
                    room: row.try_get("room")?,
                    sender: row.try_get::<Uuid, _>("sender")?.into(),
                    body: row.try_get("body")?,
                    sent_at: row.try_get("sent_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        messages.reverse();

        debug!(count = messages.len(), "Room history fetched from database");
        Ok(messages)
    }
}
