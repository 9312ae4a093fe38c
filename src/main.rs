//! Banana Clicker Game Server
//!
//! Binds the WebSocket server and serves until Ctrl-C.
//! Users are kept in memory unless built with `mysql` and `DATABASE_URL` is set.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use banana_clicker::{
    VERSION,
    game::AchievementTracker,
    network::{Dispatcher, GameServer, ServerConfig},
    store::{MemoryStore, UserStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();

    info!("Banana Clicker Server v{}", VERSION);
    info!("Bind Address: {}", config.bind_addr);
    info!("Max Connections: {}", config.max_connections);

    #[cfg(feature = "mysql")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        use banana_clicker::store::{MySqlConfig, MySqlStore};

        let max_connections = std::env::var("BANANA_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let store = MySqlStore::connect(&MySqlConfig::new(&url).with_max_connections(max_connections)).await?;
        return serve(config, store).await;
    }

    info!("Using in-memory user store");
    serve(config, MemoryStore::new()).await
}

async fn serve<S: UserStore>(config: ServerConfig, store: S) -> anyhow::Result<()> {
    let achievements = Arc::new(AchievementTracker::new());
    let dispatcher = Arc::new(
        Dispatcher::new(store, achievements).with_store_timeout(config.store_timeout),
    );
    let server = Arc::new(GameServer::new(config, dispatcher));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
