use roomrelay::{
    AppState, Config, InMemoryConnectionManager, InMemoryMessageStore, InMemoryRoomRegistry,
    MessageStore, PostgresMessageStore, RelayEngine, DEFAULT_ROOM_CAPACITY,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomrelay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(bind_addr = %config.bind_addr, "Starting room relay server");

    // Messages go to PostgreSQL when DATABASE_URL is set, memory otherwise
    let message_store: Arc<dyn MessageStore> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let store = PostgresMessageStore::new(pool);
            store.ensure_schema().await?;
            info!("Persisting messages to PostgreSQL");
            Arc::new(store)
        }
        None => {
            warn!(
                per_room = DEFAULT_ROOM_CAPACITY,
                "DATABASE_URL not set, keeping only recent messages in memory (development only)"
            );
            Arc::new(InMemoryMessageStore::new())
        }
    };

    let room_registry = Arc::new(InMemoryRoomRegistry::new());
    let connection_manager = Arc::new(InMemoryConnectionManager::new());
    let relay_engine = Arc::new(RelayEngine::new(
        room_registry.clone(),
        message_store,
        connection_manager,
        config.history_limit,
    ));

    let bind_addr = config.bind_addr;
    let app_state = AppState::new(relay_engine, room_registry, Arc::new(config));
    let app = roomrelay::router(app_state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to install ctrl-c handler");
    }
    info!("Shutdown signal received");
}
