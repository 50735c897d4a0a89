use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::models::RoomSummary;
use crate::shared::{AppError, AppState};

/// HTTP handler for listing rooms that currently have members
///
/// GET /rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<RoomSummary>>, AppError> {
    let rooms = state.room_registry.list_rooms().await;

    info!(room_count = rooms.len(), "Rooms listed successfully");

    Ok(Json(rooms))
}
