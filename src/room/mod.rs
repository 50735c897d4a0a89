// Public API - what other modules can use
pub use handlers::list_rooms;
pub use models::{JoinResult, LeaveResult, RoomSummary};
pub use registry::{InMemoryRoomRegistry, RoomRegistry};

// Internal modules
mod handlers;
pub mod models;
pub mod registry;
