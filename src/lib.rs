// Library crate for the room relay server
// This file exposes the public API for integration tests

pub mod config;
pub mod message;
pub mod participant;
pub mod relay;
pub mod room;
pub mod shared;
pub mod websockets;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use config::{Config, ConfigError};
pub use message::{
    ChatMessage, InMemoryMessageStore, MessageStore, PostgresMessageStore, DEFAULT_ROOM_CAPACITY,
};
pub use participant::ParticipantId;
pub use relay::{NotifyOutcome, RelayEngine, SendReceipt};
pub use room::{InMemoryRoomRegistry, JoinResult, LeaveResult, RoomRegistry, RoomSummary};
pub use shared::{AppError, AppState};
pub use websockets::{
    ConnectionManager, InMemoryConnectionManager, MessageHandler, MessageType, WebSocketMessage,
    WebsocketReceiveHandler,
};

/// Builds the HTTP router: the WebSocket endpoint plus the room listing
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "roomrelay" }))
        .route("/ws", get(websockets::websocket_handler))
        .route("/rooms", get(room::list_rooms))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
