use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinegraph_api::api::{create_router, AppState};
use cinegraph_api::config::Config;
use cinegraph_api::db::{create_pool, MemoryStore, PgStore, Storage};
use cinegraph_api::services::spawn_feed_writer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            let store = PgStore::new(pool);
            store.migrate().await?;
            tracing::info!("connected to PostgreSQL");
            Arc::new(store)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let (feed, _feed_writer) = spawn_feed_writer(store.clone());
    let state = AppState::with_store(store, feed);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
