use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::store::{DirectorStore, FeedStore, FilmStore, GraphStore, ReviewStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Director, FeedEvent, Film, NewDirector, NewFilm, NewReview, NewUser, Review, User,
};

/// In-memory backend: entity arenas keyed by id plus a two-sided like
/// index. Used by the test suite and when no DATABASE_URL is configured.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    films: BTreeMap<i64, Film>,
    directors: BTreeMap<i64, Director>,
    reviews: BTreeMap<i64, Review>,
    likes_by_user: HashMap<i64, BTreeSet<i64>>,
    likes_by_film: HashMap<i64, BTreeSet<i64>>,
    friendships: BTreeSet<(i64, i64)>,
    feed: Vec<FeedEvent>,
    next_user_id: i64,
    next_film_id: i64,
    next_director_id: i64,
    next_review_id: i64,
    next_event_id: i64,
}

impl Inner {
    fn unlink_like(&mut self, user_id: i64, film_id: i64) {
        if let Some(films) = self.likes_by_user.get_mut(&user_id) {
            films.remove(&film_id);
        }
        if let Some(users) = self.likes_by_film.get_mut(&film_id) {
            users.remove(&user_id);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            email: new.email,
            login: new.login,
            name: new.name,
            birthday: new.birthday,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(AppError::user_not_found(user.id));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::user_not_found(id))
    }

    async fn user_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.read().await.users.contains_key(&id))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.users.remove(&id).is_none() {
            return Ok(false);
        }
        // Cascade: likes and friendships mentioning the user, both ends.
        let films: Vec<i64> = inner
            .likes_by_user
            .remove(&id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for film_id in films {
            if let Some(users) = inner.likes_by_film.get_mut(&film_id) {
                users.remove(&id);
            }
        }
        inner
            .friendships
            .retain(|&(user_id, friend_id)| user_id != id && friend_id != id);
        inner.reviews.retain(|_, review| review.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl FilmStore for MemoryStore {
    async fn create_film(&self, new: NewFilm) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        inner.next_film_id += 1;
        let film = Film {
            id: inner.next_film_id,
            name: new.name,
            description: new.description,
            release_date: new.release_date,
            duration: new.duration,
            genre_ids: new.genre_ids,
            director_ids: new.director_ids,
        };
        inner.films.insert(film.id, film.clone());
        Ok(film)
    }

    async fn update_film(&self, film: Film) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        if !inner.films.contains_key(&film.id) {
            return Err(AppError::film_not_found(film.id));
        }
        inner.films.insert(film.id, film.clone());
        Ok(film)
    }

    async fn get_film(&self, id: i64) -> AppResult<Film> {
        let inner = self.inner.read().await;
        inner
            .films
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::film_not_found(id))
    }

    async fn film_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.read().await.films.contains_key(&id))
    }

    async fn list_films(&self) -> AppResult<Vec<Film>> {
        Ok(self.inner.read().await.films.values().cloned().collect())
    }

    async fn films_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.films.get(id).cloned())
            .collect())
    }

    async fn delete_film(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.films.remove(&id).is_none() {
            return Ok(false);
        }
        let likers: Vec<i64> = inner
            .likes_by_film
            .remove(&id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for user_id in likers {
            if let Some(films) = inner.likes_by_user.get_mut(&user_id) {
                films.remove(&id);
            }
        }
        inner.reviews.retain(|_, review| review.film_id != id);
        Ok(true)
    }
}

#[async_trait]
impl DirectorStore for MemoryStore {
    async fn create_director(&self, new: NewDirector) -> AppResult<Director> {
        let mut inner = self.inner.write().await;
        inner.next_director_id += 1;
        let director = Director {
            id: inner.next_director_id,
            name: new.name,
        };
        inner.directors.insert(director.id, director.clone());
        Ok(director)
    }

    async fn update_director(&self, director: Director) -> AppResult<Director> {
        let mut inner = self.inner.write().await;
        if !inner.directors.contains_key(&director.id) {
            return Err(AppError::director_not_found(director.id));
        }
        inner.directors.insert(director.id, director.clone());
        Ok(director)
    }

    async fn get_director(&self, id: i64) -> AppResult<Director> {
        let inner = self.inner.read().await;
        inner
            .directors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::director_not_found(id))
    }

    async fn director_exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.read().await.directors.contains_key(&id))
    }

    async fn list_directors(&self) -> AppResult<Vec<Director>> {
        Ok(self.inner.read().await.directors.values().cloned().collect())
    }

    async fn delete_director(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.directors.remove(&id).is_none() {
            return Ok(false);
        }
        // Detach the credit from every film; the films stay.
        for film in inner.films.values_mut() {
            film.director_ids.retain(|&director_id| director_id != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn add_like(&self, user_id: i64, film_id: i64) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .likes_by_user
            .entry(user_id)
            .or_default()
            .insert(film_id);
        inner
            .likes_by_film
            .entry(film_id)
            .or_default()
            .insert(user_id);
        Ok(())
    }

    async fn remove_like(&self, user_id: i64, film_id: i64) -> AppResult<()> {
        self.inner.write().await.unlink_like(user_id, film_id);
        Ok(())
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.inner.write().await.friendships.insert((user_id, friend_id));
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.inner.write().await.friendships.remove(&(user_id, friend_id));
        Ok(())
    }

    async fn likes_of_user(&self, user_id: i64) -> AppResult<HashSet<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes_by_user
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn likers_of_film(&self, film_id: i64) -> AppResult<HashSet<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes_by_film
            .get(&film_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn like_counts(&self) -> AppResult<HashMap<i64, u64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .likes_by_film
            .iter()
            .filter(|(_, users)| !users.is_empty())
            .map(|(&film_id, users)| (film_id, users.len() as u64))
            .collect())
    }

    async fn friends_of(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .friendships
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|&(_, friend_id)| friend_id)
            .collect())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn create_review(&self, new: NewReview) -> AppResult<Review> {
        let mut inner = self.inner.write().await;
        inner.next_review_id += 1;
        let review = Review {
            id: inner.next_review_id,
            film_id: new.film_id,
            user_id: new.user_id,
            content: new.content,
            is_positive: new.is_positive,
        };
        inner.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn update_review(
        &self,
        id: i64,
        content: String,
        is_positive: bool,
    ) -> AppResult<Review> {
        let mut inner = self.inner.write().await;
        let review = inner
            .reviews
            .get_mut(&id)
            .ok_or_else(|| AppError::review_not_found(id))?;
        review.content = content;
        review.is_positive = is_positive;
        Ok(review.clone())
    }

    async fn get_review(&self, id: i64) -> AppResult<Review> {
        let inner = self.inner.read().await;
        inner
            .reviews
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::review_not_found(id))
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.reviews.remove(&id).is_some())
    }

    async fn reviews_for_film(&self, film_id: i64, count: usize) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .values()
            .rev()
            .filter(|review| review.film_id == film_id)
            .take(count)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn append_event(&self, mut event: FeedEvent) -> AppResult<i64> {
        let mut inner = self.inner.write().await;
        inner.next_event_id += 1;
        event.event_id = inner.next_event_id;
        let event_id = event.event_id;
        inner.feed.push(event);
        Ok(event_id)
    }

    async fn user_feed(&self, user_id: i64) -> AppResult<Vec<FeedEvent>> {
        let inner = self.inner.read().await;
        let mut events: Vec<FeedEvent> = inner
            .feed
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by_key(|event| (event.timestamp, event.event_id));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, Operation};
    use chrono::NaiveDate;

    fn new_user(n: u32) -> NewUser {
        NewUser {
            email: format!("user{}@example.com", n),
            login: format!("user{}", n),
            name: format!("User {}", n),
            birthday: None,
        }
    }

    fn new_film(name: &str) -> NewFilm {
        NewFilm {
            name: name.to_string(),
            description: None,
            release_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            duration: 100,
            genre_ids: vec![],
            director_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_like_add_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user(1)).await.unwrap();
        let film = store.create_film(new_film("Solaris")).await.unwrap();

        store.add_like(user.id, film.id).await.unwrap();
        store.add_like(user.id, film.id).await.unwrap();

        assert_eq!(store.likers_of_film(film.id).await.unwrap().len(), 1);
        assert_eq!(store.like_counts().await.unwrap()[&film.id], 1);
    }

    #[tokio::test]
    async fn test_remove_missing_like_is_a_noop() {
        let store = MemoryStore::new();
        store.remove_like(1, 2).await.unwrap();
        assert!(store.likes_of_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_friendship_is_directed() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(1)).await.unwrap();
        let b = store.create_user(new_user(2)).await.unwrap();

        store.add_friend(a.id, b.id).await.unwrap();

        assert_eq!(store.friends_of(a.id).await.unwrap(), vec![b.id]);
        assert!(store.friends_of(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_edges() {
        let store = MemoryStore::new();
        let a = store.create_user(new_user(1)).await.unwrap();
        let b = store.create_user(new_user(2)).await.unwrap();
        let film = store.create_film(new_film("Mirror")).await.unwrap();

        store.add_like(a.id, film.id).await.unwrap();
        store.add_friend(a.id, b.id).await.unwrap();
        store.add_friend(b.id, a.id).await.unwrap();

        assert!(store.delete_user(a.id).await.unwrap());

        assert!(store.likers_of_film(film.id).await.unwrap().is_empty());
        assert!(store.friends_of(b.id).await.unwrap().is_empty());
        // Deleting again reports that nothing was removed.
        assert!(!store.delete_user(a.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_film_cascades_likes() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user(1)).await.unwrap();
        let film = store.create_film(new_film("Stalker")).await.unwrap();
        store.add_like(user.id, film.id).await.unwrap();

        assert!(store.delete_film(film.id).await.unwrap());
        assert!(store.likes_of_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_director_detaches_credits() {
        let store = MemoryStore::new();
        let director = store
            .create_director(NewDirector {
                name: "Andrei Tarkovsky".to_string(),
            })
            .await
            .unwrap();
        let mut new = new_film("Nostalghia");
        new.director_ids = vec![director.id];
        let film = store.create_film(new).await.unwrap();

        assert!(store.delete_director(director.id).await.unwrap());
        assert!(store.get_film(film.id).await.unwrap().director_ids.is_empty());
        assert!(!store.delete_director(director.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_film_replaces_genres_and_directors() {
        let store = MemoryStore::new();
        let director = store
            .create_director(NewDirector {
                name: "Sergei Parajanov".to_string(),
            })
            .await
            .unwrap();
        let mut film = store.create_film(new_film("The Color of Pomegranates")).await.unwrap();

        film.genre_ids = vec![2, 2, 5];
        film.director_ids = vec![director.id];
        // Duplicate genre ids in the payload must not fail the update.
        let updated = store.update_film(film).await.unwrap();
        assert_eq!(updated.director_ids, vec![director.id]);

        let fetched = store.get_film(updated.id).await.unwrap();
        assert_eq!(fetched.director_ids, vec![director.id]);
    }

    #[tokio::test]
    async fn test_feed_event_ids_are_monotone() {
        let store = MemoryStore::new();
        let first = store
            .append_event(FeedEvent::now(1, 10, EventType::Like, Operation::Add))
            .await
            .unwrap();
        let second = store
            .append_event(FeedEvent::now(1, 10, EventType::Like, Operation::Remove))
            .await
            .unwrap();
        assert!(second > first);

        let feed = store.user_feed(1).await.unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].event_id, first);
        assert_eq!(feed[1].event_id, second);
    }
}
