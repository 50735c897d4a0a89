// Public API - what other modules can use
pub use models::ChatMessage;
pub use store::{InMemoryMessageStore, DEFAULT_ROOM_CAPACITY, MessageStore, PostgresMessageStore};

// Internal modules
pub mod models;
pub mod store;
