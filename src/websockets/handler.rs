use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::participant::{resolve_display_name, ParticipantId};
use crate::relay::RelayEngine;
use crate::shared::{AppError, AppState};
use crate::websockets::messages::{
    MessageType, NotifyPayload, RoomPayload, SendChatPayload, WebSocketMessage,
};

use super::socket::{Connection, MessageHandler, SocketWrapper};

pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Message handler for receiving WebSocket messages from the client
///
/// Validates each request and hands it to the relay engine. Anything the
/// engine cannot act on is answered with an ERROR message to the sender.
pub struct WebsocketReceiveHandler {
    relay_engine: Arc<RelayEngine>,
    max_body_len: usize,
    max_room_name_len: usize,
}

impl WebsocketReceiveHandler {
    pub fn new(relay_engine: Arc<RelayEngine>, config: &Config) -> Self {
        Self {
            relay_engine,
            max_body_len: config.max_body_len,
            max_room_name_len: config.max_room_name_len,
        }
    }

    async fn dispatch(
        &self,
        participant: ParticipantId,
        message: WebSocketMessage,
    ) -> Result<(), AppError> {
        match message.message_type {
            MessageType::Join => {
                let payload: RoomPayload = parse_payload(&message)?;
                let room = self.validate_room(&payload.room)?;
                self.relay_engine.join(participant, room).await;
            }
            MessageType::Leave => {
                let payload: RoomPayload = parse_payload(&message)?;
                let room = self.validate_room(&payload.room)?;
                self.relay_engine.leave(participant, room).await;
            }
            MessageType::Chat => {
                let payload: SendChatPayload = parse_payload(&message)?;
                let room = self.validate_room(&payload.room)?;
                let body = self.validate_body(&payload.content)?;
                self.relay_engine.send(participant, room, body).await;
            }
            MessageType::Notify => {
                let payload: NotifyPayload = parse_payload(&message)?;
                self.relay_engine
                    .notify(participant, payload.recipient, payload.payload)
                    .await;
            }
            other => {
                return Err(AppError::InvalidRequest(format!(
                    "Unsupported message type: {:?}",
                    other
                )));
            }
        }
        Ok(())
    }

    fn validate_room<'a>(&self, room: &'a str) -> Result<&'a str, AppError> {
        let room = room.trim();
        if room.is_empty() {
            return Err(AppError::InvalidRequest(
                "Room name must not be empty".to_string(),
            ));
        }
        if room.chars().count() > self.max_room_name_len {
            return Err(AppError::InvalidRequest(format!(
                "Room name longer than {} characters",
                self.max_room_name_len
            )));
        }
        Ok(room)
    }

    fn validate_body<'a>(&self, body: &'a str) -> Result<&'a str, AppError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::InvalidRequest(
                "Message must not be empty".to_string(),
            ));
        }
        if body.chars().count() > self.max_body_len {
            return Err(AppError::InvalidRequest(format!(
                "Message longer than {} characters",
                self.max_body_len
            )));
        }
        Ok(body)
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(message: &WebSocketMessage) -> Result<T, AppError> {
    message.parse_payload().map_err(|e| {
        AppError::InvalidRequest(format!(
            "Invalid payload for {:?}: {}",
            message.message_type, e
        ))
    })
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, participant: ParticipantId, message: String) {
        debug!(
            participant_id = %participant,
            message = %message,
            "Received message"
        );

        let result = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => self.dispatch(participant, ws_message).await,
            Err(e) => Err(AppError::InvalidRequest(format!(
                "Malformed message: {}",
                e
            ))),
        };

        if let Err(e) = result {
            warn!(
                participant_id = %participant,
                error = %e,
                "Rejected WebSocket message"
            );
            self.relay_engine
                .send_error(participant, e.to_string())
                .await;
        }
    }
}

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    pub name: Option<String>,
}

/// Resolves the display label for a new connection, rejecting over-long names
fn display_name_from_query(name: Option<&str>) -> Result<String, AppError> {
    let display_name = resolve_display_name(name);
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        warn!(display_name = %display_name, "Rejecting over-long display name");
        return Err(AppError::InvalidRequest(format!(
            "Display name longer than {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }
    Ok(display_name)
}

/// WebSocket upgrade handler
///
/// GET /ws?name=X
/// Every accepted socket becomes a brand-new participant; `name` is only a
/// display label and a generated one is used when it is missing.
#[instrument(name = "websocket_handler", skip(state, ws))]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WebSocketQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let display_name = display_name_from_query(query.name.as_deref())?;

    info!(display_name = %display_name, "WebSocket connection requested");

    Ok(ws.on_upgrade(move |socket| run_participant_session(Box::new(socket), display_name, state)))
}

/// Drives one participant from connect to disconnect over an upgraded socket
async fn run_participant_session(
    socket: Box<dyn SocketWrapper>,
    display_name: String,
    app_state: AppState,
) {
    let participant = ParticipantId::new();

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state
        .relay_engine
        .connect(participant, display_name.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(WebsocketReceiveHandler::new(
        Arc::clone(&app_state.relay_engine),
        &app_state.config,
    ));

    let connection = Connection::new(participant, socket, outbound_receiver, message_handler);

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(
                participant_id = %participant,
                display_name = %display_name,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                participant_id = %participant,
                display_name = %display_name,
                error = %e,
                "WebSocket connection error"
            );
        }
    }

    // Disconnection is terminal: leave every room and drop the channel
    app_state.relay_engine.disconnect(participant).await;
}
