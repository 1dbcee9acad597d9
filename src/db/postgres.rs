use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::db::store::{DirectorStore, FeedStore, FilmStore, GraphStore, ReviewStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Director, FeedEvent, Film, NewDirector, NewFilm, NewReview, NewUser, Review, User,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Relational backend. Every query is a bound-parameter statement; edge
/// uniqueness rides on the primary keys (ON CONFLICT DO NOTHING), and
/// cascade deletes run in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn genres_for(&self, film_ids: &[i64]) -> AppResult<HashMap<i64, Vec<i32>>> {
        let rows = sqlx::query(
            "SELECT film_id, genre_id FROM film_genres WHERE film_id = ANY($1) ORDER BY genre_id",
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<i32>> = HashMap::new();
        for row in rows {
            genres
                .entry(row.get("film_id"))
                .or_default()
                .push(row.get("genre_id"));
        }
        Ok(genres)
    }

    async fn directors_for(&self, film_ids: &[i64]) -> AppResult<HashMap<i64, Vec<i64>>> {
        let rows = sqlx::query(
            "SELECT film_id, director_id FROM film_directors WHERE film_id = ANY($1) \
             ORDER BY director_id",
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut directors: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in rows {
            directors
                .entry(row.get("film_id"))
                .or_default()
                .push(row.get("director_id"));
        }
        Ok(directors)
    }

    /// Fills in the genre and director id lists from the join tables.
    async fn attach_relations(&self, mut films: Vec<Film>) -> AppResult<Vec<Film>> {
        let ids: Vec<i64> = films.iter().map(|film| film.id).collect();
        let mut genres = self.genres_for(&ids).await?;
        let mut directors = self.directors_for(&ids).await?;
        for film in &mut films {
            film.genre_ids = genres.remove(&film.id).unwrap_or_default();
            film.director_ids = directors.remove(&film.id).unwrap_or_default();
        }
        Ok(films)
    }
}

fn map_user(row: &PgRow) -> User {
    User {
        id: row.get("user_id"),
        email: row.get("email"),
        login: row.get("login"),
        name: row.get("name"),
        birthday: row.get("birthday"),
    }
}

fn map_film(row: &PgRow) -> Film {
    Film {
        id: row.get("film_id"),
        name: row.get("name"),
        description: row.get("description"),
        release_date: row.get("release_date"),
        duration: row.get("duration"),
        genre_ids: Vec::new(),
        director_ids: Vec::new(),
    }
}

fn map_director(row: &PgRow) -> Director {
    Director {
        id: row.get("director_id"),
        name: row.get("name"),
    }
}

fn map_review(row: &PgRow) -> Review {
    Review {
        id: row.get("review_id"),
        film_id: row.get("film_id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        is_positive: row.get("is_positive"),
    }
}

fn map_feed_event(row: &PgRow) -> AppResult<FeedEvent> {
    let event_type: String = row.get("event_type");
    let operation: String = row.get("operation");
    let timestamp: DateTime<Utc> = row.get("time_stamp");
    Ok(FeedEvent {
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        entity_id: row.get("entity_id"),
        event_type: event_type.parse().map_err(AppError::Internal)?,
        operation: operation.parse().map_err(AppError::Internal)?,
        timestamp,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> AppResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, login, name, birthday) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, login, name, birthday",
        )
        .bind(&new.email)
        .bind(&new.login)
        .bind(&new.name)
        .bind(new.birthday)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_user(&row))
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let result = sqlx::query(
            "UPDATE users SET email = $1, login = $2, name = $3, birthday = $4 WHERE user_id = $5",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found(user.id));
        }
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<User> {
        let row = sqlx::query(
            "SELECT user_id, email, login, name, birthday FROM users WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_user(&row))
            .ok_or_else(|| AppError::user_not_found(id))
    }

    async fn user_exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT user_id, email, login, name, birthday FROM users ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_user).collect())
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM friendships WHERE user_id = $1 OR friend_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM likes WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FilmStore for PgStore {
    async fn create_film(&self, new: NewFilm) -> AppResult<Film> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "INSERT INTO films (name, description, release_date, duration) \
             VALUES ($1, $2, $3, $4) \
             RETURNING film_id, name, description, release_date, duration",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.release_date)
        .bind(new.duration)
        .fetch_one(&mut *tx)
        .await?;
        let mut film = map_film(&row);
        for genre_id in &new.genre_ids {
            sqlx::query(
                "INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(film.id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
        }
        for director_id in &new.director_ids {
            sqlx::query(
                "INSERT INTO film_directors (film_id, director_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(film.id)
            .bind(director_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        film.genre_ids = new.genre_ids;
        film.director_ids = new.director_ids;
        Ok(film)
    }

    async fn update_film(&self, film: Film) -> AppResult<Film> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE films SET name = $1, description = $2, release_date = $3, duration = $4 \
             WHERE film_id = $5",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::film_not_found(film.id));
        }
        sqlx::query("DELETE FROM film_genres WHERE film_id = $1")
            .bind(film.id)
            .execute(&mut *tx)
            .await?;
        for genre_id in &film.genre_ids {
            sqlx::query(
                "INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(film.id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("DELETE FROM film_directors WHERE film_id = $1")
            .bind(film.id)
            .execute(&mut *tx)
            .await?;
        for director_id in &film.director_ids {
            sqlx::query(
                "INSERT INTO film_directors (film_id, director_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(film.id)
            .bind(director_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(film)
    }

    async fn get_film(&self, id: i64) -> AppResult<Film> {
        let row = sqlx::query(
            "SELECT film_id, name, description, release_date, duration FROM films \
             WHERE film_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        let film = row
            .map(|row| map_film(&row))
            .ok_or_else(|| AppError::film_not_found(id))?;
        let mut films = self.attach_relations(vec![film]).await?;
        Ok(films.remove(0))
    }

    async fn film_exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM films WHERE film_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_films(&self) -> AppResult<Vec<Film>> {
        let rows = sqlx::query(
            "SELECT film_id, name, description, release_date, duration FROM films \
             ORDER BY film_id",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_relations(rows.iter().map(map_film).collect()).await
    }

    async fn films_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Film>> {
        let rows = sqlx::query(
            "SELECT film_id, name, description, release_date, duration FROM films \
             WHERE film_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let films = self.attach_relations(rows.iter().map(map_film).collect()).await?;
        // Preserve the caller's ordering; unknown ids are simply absent.
        let by_id: HashMap<i64, Film> = films.into_iter().map(|film| (film.id, film)).collect();
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn delete_film(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM likes WHERE film_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM films WHERE film_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DirectorStore for PgStore {
    async fn create_director(&self, new: NewDirector) -> AppResult<Director> {
        let row = sqlx::query(
            "INSERT INTO directors (name) VALUES ($1) RETURNING director_id, name",
        )
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_director(&row))
    }

    async fn update_director(&self, director: Director) -> AppResult<Director> {
        let result = sqlx::query("UPDATE directors SET name = $1 WHERE director_id = $2")
            .bind(&director.name)
            .bind(director.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::director_not_found(director.id));
        }
        Ok(director)
    }

    async fn get_director(&self, id: i64) -> AppResult<Director> {
        let row = sqlx::query("SELECT director_id, name FROM directors WHERE director_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| map_director(&row))
            .ok_or_else(|| AppError::director_not_found(id))
    }

    async fn director_exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM directors WHERE director_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_directors(&self) -> AppResult<Vec<Director>> {
        let rows = sqlx::query("SELECT director_id, name FROM directors ORDER BY director_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(map_director).collect())
    }

    async fn delete_director(&self, id: i64) -> AppResult<bool> {
        // film_directors rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM directors WHERE director_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GraphStore for PgStore {
    async fn add_like(&self, user_id: i64, film_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO likes (user_id, film_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(film_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_like(&self, user_id: i64, film_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND film_id = $2")
            .bind(user_id)
            .bind(film_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO friendships (user_id, friend_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM friendships WHERE user_id = $1 AND friend_id = $2")
            .bind(user_id)
            .bind(friend_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn likes_of_user(&self, user_id: i64) -> AppResult<HashSet<i64>> {
        let rows = sqlx::query("SELECT film_id FROM likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("film_id")).collect())
    }

    async fn likers_of_film(&self, film_id: i64) -> AppResult<HashSet<i64>> {
        let rows = sqlx::query("SELECT user_id FROM likes WHERE film_id = $1")
            .bind(film_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    async fn like_counts(&self) -> AppResult<HashMap<i64, u64>> {
        let rows = sqlx::query(
            "SELECT film_id, COUNT(user_id) AS likes_count FROM likes GROUP BY film_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let count: i64 = row.get("likes_count");
                (row.get("film_id"), count as u64)
            })
            .collect())
    }

    async fn friends_of(&self, user_id: i64) -> AppResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT friend_id FROM friendships WHERE user_id = $1 ORDER BY friend_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("friend_id")).collect())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn create_review(&self, new: NewReview) -> AppResult<Review> {
        let row = sqlx::query(
            "INSERT INTO reviews (film_id, user_id, content, is_positive) \
             VALUES ($1, $2, $3, $4) \
             RETURNING review_id, film_id, user_id, content, is_positive",
        )
        .bind(new.film_id)
        .bind(new.user_id)
        .bind(&new.content)
        .bind(new.is_positive)
        .fetch_one(&self.pool)
        .await?;
        Ok(map_review(&row))
    }

    async fn update_review(
        &self,
        id: i64,
        content: String,
        is_positive: bool,
    ) -> AppResult<Review> {
        let row = sqlx::query(
            "UPDATE reviews SET content = $1, is_positive = $2 WHERE review_id = $3 \
             RETURNING review_id, film_id, user_id, content, is_positive",
        )
        .bind(&content)
        .bind(is_positive)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_review(&row))
            .ok_or_else(|| AppError::review_not_found(id))
    }

    async fn get_review(&self, id: i64) -> AppResult<Review> {
        let row = sqlx::query(
            "SELECT review_id, film_id, user_id, content, is_positive FROM reviews \
             WHERE review_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| map_review(&row))
            .ok_or_else(|| AppError::review_not_found(id))
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reviews_for_film(&self, film_id: i64, count: usize) -> AppResult<Vec<Review>> {
        let rows = sqlx::query(
            "SELECT review_id, film_id, user_id, content, is_positive FROM reviews \
             WHERE film_id = $1 ORDER BY review_id DESC LIMIT $2",
        )
        .bind(film_id)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(map_review).collect())
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn append_event(&self, event: FeedEvent) -> AppResult<i64> {
        let row = sqlx::query(
            "INSERT INTO feed (user_id, entity_id, event_type, operation, time_stamp) \
             VALUES ($1, $2, $3, $4, $5) RETURNING event_id",
        )
        .bind(event.user_id)
        .bind(event.entity_id)
        .bind(event.event_type.as_str())
        .bind(event.operation.as_str())
        .bind(event.timestamp)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("event_id"))
    }

    async fn user_feed(&self, user_id: i64) -> AppResult<Vec<FeedEvent>> {
        let rows = sqlx::query(
            "SELECT event_id, user_id, entity_id, event_type, operation, time_stamp \
             FROM feed WHERE user_id = $1 ORDER BY time_stamp, event_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_feed_event).collect()
    }
}
