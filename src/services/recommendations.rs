use std::collections::HashMap;

use crate::db::store::{FilmStore, GraphStore, Storage, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::Film;

/// Collaborative-filtering recommendations for `user_id`.
///
/// The most similar user is the one sharing the largest number of liked
/// films with the target; ties break on the lowest user id. The result is
/// that neighbor's likes minus the target's own, ascending by film id.
/// A user with no likes, or with no overlap with anyone, gets an empty
/// result rather than an error.
pub async fn recommend(store: &dyn Storage, user_id: i64) -> AppResult<Vec<Film>> {
    if !store.user_exists(user_id).await? {
        return Err(AppError::user_not_found(user_id));
    }

    let target = store.likes_of_user(user_id).await?;
    if target.is_empty() {
        return Ok(Vec::new());
    }

    // Walk co-likers through the film index instead of scanning every
    // user pair; cost is the total number of co-like rows.
    let mut overlap: HashMap<i64, u64> = HashMap::new();
    for &film_id in &target {
        for liker in store.likers_of_film(film_id).await? {
            if liker != user_id {
                *overlap.entry(liker).or_default() += 1;
            }
        }
    }

    let mut candidates: Vec<(i64, u64)> = overlap.into_iter().collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let Some(&(neighbor, _)) = candidates.first() else {
        return Ok(Vec::new());
    };
    tracing::debug!(user_id, neighbor, "recommendation neighbor selected");

    let neighbor_likes = store.likes_of_user(neighbor).await?;
    let mut film_ids: Vec<i64> = neighbor_likes.difference(&target).copied().collect();
    film_ids.sort_unstable();

    store.films_by_ids(&film_ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::testutil::{film, user};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let err = recommend(store.as_ref(), 5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_with_no_likes_gets_empty_result() {
        let store = Arc::new(MemoryStore::new());
        let u = user(store.as_ref(), 1).await;
        assert!(recommend(store.as_ref(), u.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_overlap_gets_empty_result() {
        let store = Arc::new(MemoryStore::new());
        let u1 = user(store.as_ref(), 1).await;
        let u2 = user(store.as_ref(), 2).await;
        let f1 = film(store.as_ref(), "F1").await;
        let f2 = film(store.as_ref(), "F2").await;
        store.add_like(u1.id, f1.id).await.unwrap();
        store.add_like(u2.id, f2.id).await.unwrap();

        assert!(recommend(store.as_ref(), u1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_best_overlap_neighbor_wins() {
        let store = Arc::new(MemoryStore::new());
        let u1 = user(store.as_ref(), 1).await;
        let u2 = user(store.as_ref(), 2).await;
        let u3 = user(store.as_ref(), 3).await;
        let f1 = film(store.as_ref(), "F1").await;
        let f2 = film(store.as_ref(), "F2").await;
        let f3 = film(store.as_ref(), "F3").await;
        let f4 = film(store.as_ref(), "F4").await;

        // U1 likes {F1,F2}; U2 likes {F1,F2,F3}; U3 likes {F4}.
        store.add_like(u1.id, f1.id).await.unwrap();
        store.add_like(u1.id, f2.id).await.unwrap();
        store.add_like(u2.id, f1.id).await.unwrap();
        store.add_like(u2.id, f2.id).await.unwrap();
        store.add_like(u2.id, f3.id).await.unwrap();
        store.add_like(u3.id, f4.id).await.unwrap();

        let films = recommend(store.as_ref(), u1.id).await.unwrap();
        let ids: Vec<i64> = films.iter().map(|film| film.id).collect();
        assert_eq!(ids, vec![f3.id]);
    }

    #[tokio::test]
    async fn test_overlap_tie_breaks_on_lowest_user_id() {
        let store = Arc::new(MemoryStore::new());
        let u1 = user(store.as_ref(), 1).await;
        let u2 = user(store.as_ref(), 2).await;
        let u3 = user(store.as_ref(), 3).await;
        let f1 = film(store.as_ref(), "F1").await;
        let f2 = film(store.as_ref(), "F2").await;
        let f3 = film(store.as_ref(), "F3").await;

        // U2 and U3 both overlap with U1 on exactly {F1}; the lower user
        // id (U2) is the canonical pick.
        store.add_like(u1.id, f1.id).await.unwrap();
        store.add_like(u2.id, f1.id).await.unwrap();
        store.add_like(u2.id, f2.id).await.unwrap();
        store.add_like(u3.id, f1.id).await.unwrap();
        store.add_like(u3.id, f3.id).await.unwrap();

        let films = recommend(store.as_ref(), u1.id).await.unwrap();
        let ids: Vec<i64> = films.iter().map(|film| film.id).collect();
        assert_eq!(ids, vec![f2.id]);
    }

    #[tokio::test]
    async fn test_result_excludes_already_liked_films_sorted() {
        let store = Arc::new(MemoryStore::new());
        let u1 = user(store.as_ref(), 1).await;
        let u2 = user(store.as_ref(), 2).await;
        let f1 = film(store.as_ref(), "F1").await;
        let f2 = film(store.as_ref(), "F2").await;
        let f3 = film(store.as_ref(), "F3").await;

        store.add_like(u1.id, f1.id).await.unwrap();
        store.add_like(u2.id, f1.id).await.unwrap();
        store.add_like(u2.id, f3.id).await.unwrap();
        store.add_like(u2.id, f2.id).await.unwrap();

        let films = recommend(store.as_ref(), u1.id).await.unwrap();
        let ids: Vec<i64> = films.iter().map(|film| film.id).collect();
        assert_eq!(ids, vec![f2.id, f3.id]);
    }
}
