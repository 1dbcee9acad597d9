use crate::db::store::{FilmStore, ReviewStore, Storage, UserStore};
use crate::error::AppResult;
use crate::models::{EventType, NewReview, Operation, Review};
use crate::services::feed::FeedPublisher;

// Review lifecycle. Content is opaque here; what matters is that each
// successful mutation lands a REVIEW event on the author's feed.

pub async fn create_review(
    store: &dyn Storage,
    feed: &FeedPublisher,
    new: NewReview,
) -> AppResult<Review> {
    if !store.user_exists(new.user_id).await? {
        return Err(crate::error::AppError::user_not_found(new.user_id));
    }
    if !store.film_exists(new.film_id).await? {
        return Err(crate::error::AppError::film_not_found(new.film_id));
    }
    let review = store.create_review(new).await?;
    tracing::debug!(review_id = review.id, user_id = review.user_id, "review created");
    feed.publish(review.user_id, review.id, EventType::Review, Operation::Add);
    Ok(review)
}

pub async fn update_review(
    store: &dyn Storage,
    feed: &FeedPublisher,
    id: i64,
    content: String,
    is_positive: bool,
) -> AppResult<Review> {
    let review = store.update_review(id, content, is_positive).await?;
    feed.publish(review.user_id, review.id, EventType::Review, Operation::Update);
    Ok(review)
}

pub async fn delete_review(store: &dyn Storage, feed: &FeedPublisher, id: i64) -> AppResult<bool> {
    // The actor has to be resolved before the row is gone; after the
    // delete there is nothing left to look up.
    let review = store.get_review(id).await?;
    let deleted = store.delete_review(id).await?;
    if deleted {
        tracing::debug!(review_id = id, user_id = review.user_id, "review deleted");
        feed.publish(review.user_id, review.id, EventType::Review, Operation::Remove);
    }
    Ok(deleted)
}

pub async fn get_review(store: &dyn Storage, id: i64) -> AppResult<Review> {
    store.get_review(id).await
}

pub async fn reviews_for_film(
    store: &dyn Storage,
    film_id: i64,
    count: usize,
) -> AppResult<Vec<Review>> {
    if !store.film_exists(film_id).await? {
        return Err(crate::error::AppError::film_not_found(film_id));
    }
    store.reviews_for_film(film_id, count).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;
    use crate::services::feed::{get_user_feed, spawn_feed_writer};
    use crate::services::testutil::{film, settle, user};
    use std::sync::Arc;

    fn review_for(user_id: i64, film_id: i64) -> NewReview {
        NewReview {
            film_id,
            user_id,
            content: "A slow burn worth the patience".to_string(),
            is_positive: true,
        }
    }

    #[tokio::test]
    async fn test_review_lifecycle_feeds_the_author() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u = user(store.as_ref(), 1).await;
        let f = film(store.as_ref(), "Mirror").await;

        let review = create_review(store.as_ref(), &feed, review_for(u.id, f.id))
            .await
            .unwrap();
        update_review(store.as_ref(), &feed, review.id, "Changed my mind".to_string(), false)
            .await
            .unwrap();
        assert!(delete_review(store.as_ref(), &feed, review.id).await.unwrap());
        settle().await;

        let events = get_user_feed(store.as_ref(), u.id).await.unwrap();
        let ops: Vec<Operation> = events.iter().map(|event| event.operation).collect();
        assert_eq!(ops, vec![Operation::Add, Operation::Update, Operation::Remove]);
        assert!(events.iter().all(|event| event.event_type == EventType::Review));
        assert!(events.iter().all(|event| event.entity_id == review.id));
    }

    #[tokio::test]
    async fn test_deleting_missing_review_emits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u = user(store.as_ref(), 1).await;

        let err = delete_review(store.as_ref(), &feed, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        settle().await;

        assert!(get_user_feed(store.as_ref(), u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_requires_existing_user_and_film() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u = user(store.as_ref(), 1).await;

        let err = create_review(store.as_ref(), &feed, review_for(u.id, 7))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
