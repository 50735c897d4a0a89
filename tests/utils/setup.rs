#![allow(dead_code)] // Test utilities may not all be used in every test

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use roomrelay::{
    Config, InMemoryMessageStore, InMemoryRoomRegistry, MessageHandler, MessageStore,
    ParticipantId, RelayEngine, WebSocketMessage, WebsocketReceiveHandler,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub engine: Arc<RelayEngine>,
    pub registry: Arc<InMemoryRoomRegistry>,
    pub store: Arc<InMemoryMessageStore>,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub input_handler: WebsocketReceiveHandler,
    pub participants: HashMap<String, ParticipantId>,
}

impl TestSetup {
    /// Participant id for a display name registered by the builder
    pub fn id(&self, name: &str) -> ParticipantId {
        *self
            .participants
            .get(name)
            .unwrap_or_else(|| panic!("{} is not part of the setup", name))
    }

    /// Connect another participant after the setup was built
    pub async fn connect(&self, name: &str) -> ParticipantId {
        let participant = ParticipantId::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        self.engine.connect(participant, name.to_string(), tx).await;
        participant
    }

    /// Send a raw client message through the WebSocket input handler
    pub async fn send_raw(&self, name: &str, message: &str) {
        self.input_handler
            .handle_message(self.id(name), message.to_string())
            .await;
    }

    pub async fn send_message(&self, name: &str, message: WebSocketMessage) {
        let json = serde_json::to_string(&message).unwrap();
        self.send_raw(name, &json).await;
    }

    pub async fn join(&self, name: &str, room: &str) {
        self.send_message(name, WebSocketMessage::join(room.to_string()).unwrap())
            .await;
    }

    pub async fn leave(&self, name: &str, room: &str) {
        self.send_message(name, WebSocketMessage::leave(room.to_string()).unwrap())
            .await;
    }

    pub async fn send_chat(&self, name: &str, room: &str, content: &str) {
        self.send_message(
            name,
            WebSocketMessage::send_chat(room.to_string(), content.to_string()).unwrap(),
        )
        .await;
    }

    pub async fn clear_messages(&self) {
        self.mock_conn_manager.clear_messages().await;
    }
}

pub struct TestSetupBuilder {
    names: Vec<String>,
    store: Option<Arc<dyn MessageStore>>,
    config: Config,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            names: vec![],
            store: None,
            config: Config {
                history_limit: 0,
                ..Config::default()
            },
        }
    }

    pub fn with_participants(mut self, names: Vec<&str>) -> Self {
        self.names = names.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_three_participants(self) -> Self {
        self.with_participants(vec!["alice", "bob", "carol"])
    }

    /// Replace the in-memory store the engine writes to
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.config.history_limit = history_limit;
        self
    }

    pub async fn build(self) -> TestSetup {
        let registry = Arc::new(InMemoryRoomRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let mock_conn_manager = Arc::new(MockConnectionManager::new());

        let engine_store: Arc<dyn MessageStore> = match self.store {
            Some(custom) => custom,
            None => store.clone(),
        };

        let engine = Arc::new(RelayEngine::new(
            registry.clone(),
            engine_store,
            mock_conn_manager.clone(),
            self.config.history_limit,
        ));

        let mut participants = HashMap::new();
        for name in &self.names {
            let participant = ParticipantId::new();
            let (tx, _rx) = mpsc::unbounded_channel();
            engine.connect(participant, name.clone(), tx).await;
            participants.insert(name.clone(), participant);
        }

        // Drop the WELCOME messages so tests start from a clean slate
        mock_conn_manager.clear_messages().await;

        let input_handler = WebsocketReceiveHandler::new(engine.clone(), &self.config);

        TestSetup {
            engine,
            registry,
            store,
            mock_conn_manager,
            input_handler,
            participants,
        }
    }
}
