use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::relay::RelayEngine;
use crate::room::registry::RoomRegistry;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub relay_engine: Arc<RelayEngine>,
    pub room_registry: Arc<dyn RoomRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        relay_engine: Arc<RelayEngine>,
        room_registry: Arc<dyn RoomRegistry>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            relay_engine,
            room_registry,
            config,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
