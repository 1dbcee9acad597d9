use crate::db::store::{FilmStore, GraphStore, Storage, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::Film;

/// The most-liked films, optionally restricted to a genre and/or release
/// year. Ordered by like count descending; ties break on ascending film
/// id so the result is stable regardless of insertion order. Films with
/// zero likes rank after everything else rather than being dropped.
pub async fn popular_films(
    store: &dyn Storage,
    limit: i64,
    genre_id: Option<i32>,
    year: Option<i32>,
) -> AppResult<Vec<Film>> {
    if limit <= 0 {
        return Err(AppError::InvalidInput(
            "count must be a positive integer".to_string(),
        ));
    }

    let counts = store.like_counts().await?;
    let mut films: Vec<Film> = store
        .list_films()
        .await?
        .into_iter()
        .filter(|film| genre_id.map_or(true, |genre| film.genre_ids.contains(&genre)))
        .filter(|film| year.map_or(true, |year| film.year() == year))
        .collect();

    films.sort_by(|a, b| {
        let likes_a = counts.get(&a.id).copied().unwrap_or(0);
        let likes_b = counts.get(&b.id).copied().unwrap_or(0);
        likes_b.cmp(&likes_a).then(a.id.cmp(&b.id))
    });
    films.truncate(limit as usize);
    Ok(films)
}

/// Films liked by both users, ordered by global like count descending,
/// then ascending film id.
pub async fn common_films(store: &dyn Storage, user_id: i64, friend_id: i64) -> AppResult<Vec<Film>> {
    if !store.user_exists(user_id).await? {
        return Err(AppError::user_not_found(user_id));
    }
    if !store.user_exists(friend_id).await? {
        return Err(AppError::user_not_found(friend_id));
    }

    let mine = store.likes_of_user(user_id).await?;
    let theirs = store.likes_of_user(friend_id).await?;
    let counts = store.like_counts().await?;

    let mut shared: Vec<i64> = mine.intersection(&theirs).copied().collect();
    shared.sort_by(|a, b| {
        let likes_a = counts.get(a).copied().unwrap_or(0);
        let likes_b = counts.get(b).copied().unwrap_or(0);
        likes_b.cmp(&likes_a).then(a.cmp(b))
    });

    store.films_by_ids(&shared).await
}
