use serde::{Deserialize, Serialize};

/// Room entry as exposed by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    pub member_count: usize,
}

/// Result of joining a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// Participant was added; carries the member count after the join
    Joined { member_count: usize },
    /// Participant was already a member, nothing changed
    AlreadyMember { member_count: usize },
}

impl JoinResult {
    pub fn is_new_member(&self) -> bool {
        matches!(self, JoinResult::Joined { .. })
    }
}

/// Result of leaving a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveResult {
    /// Participant was removed, other members remain
    Left { remaining: usize },
    /// Participant was the last member and the room entry is gone
    RoomRemoved,
    /// Participant was not in the room (or the room does not exist)
    NotMember,
}

