use std::sync::Arc;

use crate::db::{MemoryStore, Storage};
use crate::services::feed::spawn_feed_writer;
use crate::services::FeedPublisher;

/// Shared application state: the injected storage capability and the
/// feed publisher backed by the writer task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub feed: FeedPublisher,
}

impl AppState {
    /// State over the in-memory store. Must be called inside a tokio
    /// runtime (the feed writer task is spawned here).
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        Self { store, feed }
    }

    /// State over an externally constructed store and publisher.
    pub fn with_store(store: Arc<dyn Storage>, feed: FeedPublisher) -> Self {
        Self { store, feed }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
