use crate::db::store::{FilmStore, GraphStore, Storage, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{EventType, Film, Operation, User};
use crate::services::feed::FeedPublisher;

// Like and friendship mutations. Each one checks both endpoints exist,
// commits the edge change, then publishes the feed event with an explicit
// call after the storage call returns. Re-adding an existing edge or
// removing a missing one succeeds, and still publishes since the
// operation completed.

pub async fn add_like(
    store: &dyn Storage,
    feed: &FeedPublisher,
    film_id: i64,
    user_id: i64,
) -> AppResult<Film> {
    let film = store.get_film(film_id).await?;
    store.get_user(user_id).await?;
    store.add_like(user_id, film_id).await?;
    tracing::debug!(user_id, film_id, "like added");
    feed.publish(user_id, film_id, EventType::Like, Operation::Add);
    Ok(film)
}

pub async fn remove_like(
    store: &dyn Storage,
    feed: &FeedPublisher,
    film_id: i64,
    user_id: i64,
) -> AppResult<Film> {
    let film = store.get_film(film_id).await?;
    store.get_user(user_id).await?;
    store.remove_like(user_id, film_id).await?;
    tracing::debug!(user_id, film_id, "like removed");
    feed.publish(user_id, film_id, EventType::Like, Operation::Remove);
    Ok(film)
}

pub async fn add_friend(
    store: &dyn Storage,
    feed: &FeedPublisher,
    user_id: i64,
    friend_id: i64,
) -> AppResult<User> {
    if user_id == friend_id {
        return Err(AppError::InvalidInput(
            "A user cannot befriend themselves".to_string(),
        ));
    }
    let user = store.get_user(user_id).await?;
    store.get_user(friend_id).await?;
    // One directed edge only: (user, friend). The reverse edge is the
    // friend's own decision.
    store.add_friend(user_id, friend_id).await?;
    tracing::debug!(user_id, friend_id, "friend added");
    feed.publish(user_id, friend_id, EventType::Friend, Operation::Add);
    Ok(user)
}

pub async fn remove_friend(
    store: &dyn Storage,
    feed: &FeedPublisher,
    user_id: i64,
    friend_id: i64,
) -> AppResult<User> {
    let user = store.get_user(user_id).await?;
    store.get_user(friend_id).await?;
    store.remove_friend(user_id, friend_id).await?;
    tracing::debug!(user_id, friend_id, "friend removed");
    feed.publish(user_id, friend_id, EventType::Friend, Operation::Remove);
    Ok(user)
}

/// Outgoing friends of a user, ascending by id.
pub async fn get_friends(store: &dyn Storage, user_id: i64) -> AppResult<Vec<User>> {
    store.get_user(user_id).await?;
    let mut friends = Vec::new();
    for friend_id in store.friends_of(user_id).await? {
        friends.push(store.get_user(friend_id).await?);
    }
    Ok(friends)
}

/// Users both `user_id` and `other_id` list as friends. Mutuality is
/// computed from the directed edges, never stored.
pub async fn get_common_friends(
    store: &dyn Storage,
    user_id: i64,
    other_id: i64,
) -> AppResult<Vec<User>> {
    store.get_user(user_id).await?;
    store.get_user(other_id).await?;
    let theirs: std::collections::HashSet<i64> =
        store.friends_of(other_id).await?.into_iter().collect();
    let mut common = Vec::new();
    for friend_id in store.friends_of(user_id).await? {
        if theirs.contains(&friend_id) {
            common.push(store.get_user(friend_id).await?);
        }
    }
    Ok(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::feed::spawn_feed_writer;
    use crate::services::testutil::{film, settle, user};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_like_requires_existing_endpoints() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u = user(store.as_ref(), 1).await;

        let err = add_like(store.as_ref(), &feed, 99, u.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_self_friendship_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u = user(store.as_ref(), 1).await;

        let err = add_friend(store.as_ref(), &feed, u.id, u.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_friendship_is_one_directional() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let a = user(store.as_ref(), 1).await;
        let b = user(store.as_ref(), 2).await;

        add_friend(store.as_ref(), &feed, a.id, b.id).await.unwrap();

        let a_friends = get_friends(store.as_ref(), a.id).await.unwrap();
        assert_eq!(a_friends.len(), 1);
        assert_eq!(a_friends[0].id, b.id);
        assert!(get_friends(store.as_ref(), b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_common_friends_are_computed() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let a = user(store.as_ref(), 1).await;
        let b = user(store.as_ref(), 2).await;
        let c = user(store.as_ref(), 3).await;

        add_friend(store.as_ref(), &feed, a.id, c.id).await.unwrap();
        add_friend(store.as_ref(), &feed, b.id, c.id).await.unwrap();

        let common = get_common_friends(store.as_ref(), a.id, b.id).await.unwrap();
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].id, c.id);
    }

    #[tokio::test]
    async fn test_feed_records_actions_in_order() {
        let store = Arc::new(MemoryStore::new());
        let (feed, _writer) = spawn_feed_writer(store.clone());
        let u1 = user(store.as_ref(), 1).await;
        let u2 = user(store.as_ref(), 2).await;
        let f1 = film(store.as_ref(), "Solaris").await;

        add_like(store.as_ref(), &feed, f1.id, u1.id).await.unwrap();
        remove_like(store.as_ref(), &feed, f1.id, u1.id).await.unwrap();
        add_friend(store.as_ref(), &feed, u1.id, u2.id).await.unwrap();
        settle().await;

        let events = crate::services::feed::get_user_feed(store.as_ref(), u1.id)
            .await
            .unwrap();
        let shape: Vec<(EventType, Operation)> = events
            .iter()
            .map(|event| (event.event_type, event.operation))
            .collect();
        assert_eq!(
            shape,
            vec![
                (EventType::Like, Operation::Add),
                (EventType::Like, Operation::Remove),
                (EventType::Friend, Operation::Add),
            ]
        );
        // Feeds are per-actor: u2 performed nothing.
        assert!(crate::services::feed::get_user_feed(store.as_ref(), u2.id)
            .await
            .unwrap()
            .is_empty());
    }
}
