use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::models::{JoinResult, LeaveResult, RoomSummary};
use crate::participant::ParticipantId;

/// Tracks which participants are in which rooms
///
/// Rooms exist only while they have members: the first join creates the
/// entry and the last leave removes it.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    async fn join(&self, participant: ParticipantId, room: &str) -> JoinResult;

    async fn leave(&self, participant: ParticipantId, room: &str) -> LeaveResult;

    /// Removes the participant from every room in a single step and returns
    /// the names of the rooms it was in
    async fn leave_all(&self, participant: ParticipantId) -> Vec<String>;

    /// Current members of a room, empty for an unknown room
    async fn members_of(&self, room: &str) -> Vec<ParticipantId>;

    /// Members of a room minus one participant (the sender, for fan-out)
    async fn members_except(&self, room: &str, excluded: ParticipantId) -> Vec<ParticipantId> {
        self.members_of(room)
            .await
            .into_iter()
            .filter(|member| *member != excluded)
            .collect()
    }

    async fn rooms_of(&self, participant: ParticipantId) -> Vec<String>;

    async fn list_rooms(&self) -> Vec<RoomSummary>;
}

#[derive(Default)]
struct RegistryState {
    rooms: HashMap<String, HashSet<ParticipantId>>,
    memberships: HashMap<ParticipantId, HashSet<String>>,
}

impl RegistryState {
    /// Removes one membership from both indexes. Returns None if the
    /// participant was not in the room.
    fn remove_membership(&mut self, participant: ParticipantId, room: &str) -> Option<usize> {
        let members = self.rooms.get_mut(room)?;
        if !members.remove(&participant) {
            return None;
        }
        let remaining = members.len();
        if remaining == 0 {
            self.rooms.remove(room);
        }

        if let Some(rooms) = self.memberships.get_mut(&participant) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.memberships.remove(&participant);
            }
        }

        Some(remaining)
    }
}

/// In-memory registry; both indexes live behind one lock so a membership
/// change is never half-applied to a concurrent reader
pub struct InMemoryRoomRegistry {
    state: RwLock<RegistryState>,
}

impl Default for InMemoryRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Number of rooms that currently have members
    pub async fn room_count(&self) -> usize {
        self.state.read().await.rooms.len()
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    #[instrument(skip(self), fields(participant_id = %participant))]
    async fn join(&self, participant: ParticipantId, room: &str) -> JoinResult {
        let mut state = self.state.write().await;

        let members = state.rooms.entry(room.to_string()).or_default();
        let inserted = members.insert(participant);
        let member_count = members.len();

        if !inserted {
            debug!(room = %room, "Participant already in room");
            return JoinResult::AlreadyMember { member_count };
        }

        state
            .memberships
            .entry(participant)
            .or_default()
            .insert(room.to_string());

        info!(room = %room, member_count, "Participant joined room");
        JoinResult::Joined { member_count }
    }

    #[instrument(skip(self), fields(participant_id = %participant))]
    async fn leave(&self, participant: ParticipantId, room: &str) -> LeaveResult {
        let mut state = self.state.write().await;

        match state.remove_membership(participant, room) {
            Some(0) => {
                info!(room = %room, "Room is now empty, removing");
                LeaveResult::RoomRemoved
            }
            Some(remaining) => {
                info!(room = %room, remaining, "Participant left room");
                LeaveResult::Left { remaining }
            }
            None => {
                debug!(room = %room, "Participant not in room");
                LeaveResult::NotMember
            }
        }
    }

    #[instrument(skip(self), fields(participant_id = %participant))]
    async fn leave_all(&self, participant: ParticipantId) -> Vec<String> {
        let mut state = self.state.write().await;

        let mut left: Vec<String> = state
            .memberships
            .remove(&participant)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default();
        left.sort();

        for room in &left {
            if let Some(members) = state.rooms.get_mut(room) {
                members.remove(&participant);
                if members.is_empty() {
                    state.rooms.remove(room);
                }
            }
        }

        debug!(rooms_left = left.len(), "Participant removed from all rooms");
        left
    }

    async fn members_of(&self, room: &str) -> Vec<ParticipantId> {
        let state = self.state.read().await;
        let mut members: Vec<ParticipantId> = state
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    async fn rooms_of(&self, participant: ParticipantId) -> Vec<String> {
        let state = self.state.read().await;
        let mut rooms: Vec<String> = state
            .memberships
            .get(&participant)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    async fn list_rooms(&self) -> Vec<RoomSummary> {
        let state = self.state.read().await;
        let mut rooms: Vec<RoomSummary> = state
            .rooms
            .iter()
            .map(|(name, members)| RoomSummary {
                name: name.clone(),
                member_count: members.len(),
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }
}
