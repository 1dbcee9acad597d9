use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::store::{FeedStore, Storage, UserStore};
use crate::error::AppResult;
use crate::models::{EventType, FeedEvent, Operation};

/// Fire-and-forget entry point for feed events.
///
/// `publish` hands the event to the writer task and returns immediately;
/// the triggering request never waits on, or fails because of, the feed
/// write. Delivery is at-most-once and best-effort: a write failure or a
/// dead writer drops the event with a warning, there is no retry.
#[derive(Clone)]
pub struct FeedPublisher {
    tx: mpsc::UnboundedSender<FeedEvent>,
}

impl FeedPublisher {
    pub fn publish(&self, user_id: i64, entity_id: i64, event_type: EventType, operation: Operation) {
        let event = FeedEvent::now(user_id, entity_id, event_type, operation);
        if self.tx.send(event).is_err() {
            tracing::warn!(user_id, entity_id, "feed writer gone; dropping feed event");
        }
    }
}

/// Spawns the single writer task that drains published events into the
/// feed store, in publish order. Returns the publisher and the task
/// handle; the task exits when every publisher clone is dropped.
pub fn spawn_feed_writer<S>(store: Arc<S>) -> (FeedPublisher, JoinHandle<()>)
where
    S: FeedStore + ?Sized + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<FeedEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let (user_id, entity_id) = (event.user_id, event.entity_id);
            if let Err(e) = store.append_event(event).await {
                tracing::warn!(user_id, entity_id, error = %e, "feed append failed; event lost");
            }
        }
        tracing::debug!("feed writer stopped");
    });
    (FeedPublisher { tx }, handle)
}

/// The user's activity log, oldest first.
pub async fn get_user_feed(store: &dyn Storage, user_id: i64) -> AppResult<Vec<FeedEvent>> {
    store.get_user(user_id).await?;
    store.user_feed(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        Feed {}

        #[async_trait]
        impl FeedStore for Feed {
            async fn append_event(&self, event: FeedEvent) -> AppResult<i64>;
            async fn user_feed(&self, user_id: i64) -> AppResult<Vec<FeedEvent>>;
        }
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let mut store = MockFeed::new();
        store
            .expect_append_event()
            .times(1)
            .returning(|_| Err(AppError::Internal("feed table unavailable".to_string())));

        let (publisher, handle) = spawn_feed_writer(Arc::new(store));
        publisher.publish(1, 2, EventType::Like, Operation::Add);

        // Closing the channel lets the writer drain and exit; a panic or
        // error escaping the task would fail the join.
        drop(publisher);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_publish_order() {
        let mut store = MockFeed::new();
        let mut sequence = mockall::Sequence::new();
        for expected in [Operation::Add, Operation::Remove] {
            store
                .expect_append_event()
                .times(1)
                .in_sequence(&mut sequence)
                .withf(move |event| event.operation == expected)
                .returning(|_| Ok(1));
        }

        let (publisher, handle) = spawn_feed_writer(Arc::new(store));
        publisher.publish(1, 2, EventType::Like, Operation::Add);
        publisher.publish(1, 2, EventType::Like, Operation::Remove);
        drop(publisher);
        handle.await.unwrap();
    }
}
