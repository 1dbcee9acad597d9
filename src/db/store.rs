use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Director, FeedEvent, Film, NewDirector, NewFilm, NewReview, NewUser, Review, User};

/// User records and their lifecycle.
///
/// `delete_user` cascades: every like and friendship row mentioning the
/// user (either end) goes away in the same transaction.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new: NewUser) -> AppResult<User>;
    async fn update_user(&self, user: User) -> AppResult<User>;
    /// NotFound when the id is unknown.
    async fn get_user(&self, id: i64) -> AppResult<User>;
    async fn user_exists(&self, id: i64) -> AppResult<bool>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    /// Returns whether a user row was actually deleted.
    async fn delete_user(&self, id: i64) -> AppResult<bool>;
}

/// Film records. `delete_film` cascades its like rows atomically.
#[async_trait]
pub trait FilmStore: Send + Sync {
    async fn create_film(&self, new: NewFilm) -> AppResult<Film>;
    async fn update_film(&self, film: Film) -> AppResult<Film>;
    async fn get_film(&self, id: i64) -> AppResult<Film>;
    async fn film_exists(&self, id: i64) -> AppResult<bool>;
    async fn list_films(&self) -> AppResult<Vec<Film>>;
    /// Films in the order of `ids`; unknown ids are skipped.
    async fn films_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Film>>;
    async fn delete_film(&self, id: i64) -> AppResult<bool>;
}

/// Like and friendship edges.
///
/// All mutations are idempotent: inserting an existing edge or removing a
/// missing one succeeds and leaves the store unchanged. Endpoint existence
/// is checked by the service layer, not here. Friendship edges are
/// directed; adding (A,B) never writes (B,A).
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn add_like(&self, user_id: i64, film_id: i64) -> AppResult<()>;
    async fn remove_like(&self, user_id: i64, film_id: i64) -> AppResult<()>;
    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;
    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;

    /// Film ids liked by the user.
    async fn likes_of_user(&self, user_id: i64) -> AppResult<HashSet<i64>>;
    /// User ids who like the film.
    async fn likers_of_film(&self, film_id: i64) -> AppResult<HashSet<i64>>;
    /// Like count per film; films with zero likes are absent.
    async fn like_counts(&self) -> AppResult<HashMap<i64, u64>>;
    /// Outgoing friend ids, ascending.
    async fn friends_of(&self, user_id: i64) -> AppResult<Vec<i64>>;
}

/// Director records. Deleting a director detaches it from every film
/// that credits it; the films themselves stay.
#[async_trait]
pub trait DirectorStore: Send + Sync {
    async fn create_director(&self, new: NewDirector) -> AppResult<Director>;
    async fn update_director(&self, director: Director) -> AppResult<Director>;
    async fn get_director(&self, id: i64) -> AppResult<Director>;
    async fn director_exists(&self, id: i64) -> AppResult<bool>;
    async fn list_directors(&self) -> AppResult<Vec<Director>>;
    /// Returns whether a director row was actually deleted.
    async fn delete_director(&self, id: i64) -> AppResult<bool>;
}

/// Review records. Only `content` and `is_positive` are mutable after
/// creation.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, new: NewReview) -> AppResult<Review>;
    async fn update_review(&self, id: i64, content: String, is_positive: bool)
        -> AppResult<Review>;
    async fn get_review(&self, id: i64) -> AppResult<Review>;
    async fn delete_review(&self, id: i64) -> AppResult<bool>;
    /// Reviews for a film, newest id first, truncated to `count`.
    async fn reviews_for_film(&self, film_id: i64, count: usize) -> AppResult<Vec<Review>>;
}

/// The append-only activity feed log.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Appends the event with a fresh monotonically increasing event id
    /// and returns the id.
    async fn append_event(&self, event: FeedEvent) -> AppResult<i64>;
    /// Events for the user, ordered by timestamp then event id, ascending.
    async fn user_feed(&self, user_id: i64) -> AppResult<Vec<FeedEvent>>;
}

/// The full storage capability the service layer is injected with.
pub trait Storage:
    UserStore + FilmStore + DirectorStore + GraphStore + ReviewStore + FeedStore
{
}

impl<T: UserStore + FilmStore + DirectorStore + GraphStore + ReviewStore + FeedStore> Storage
    for T
{
}
