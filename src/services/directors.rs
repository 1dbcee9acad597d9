use std::str::FromStr;

use crate::db::store::{DirectorStore, FilmStore, GraphStore, Storage};
use crate::error::{AppError, AppResult};
use crate::models::{Director, Film, NewDirector};

/// Sort order for a director's filmography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorFilmSort {
    /// Release year ascending, then film id.
    Year,
    /// Like count descending, then film id.
    Likes,
}

impl FromStr for DirectorFilmSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(DirectorFilmSort::Year),
            "likes" => Ok(DirectorFilmSort::Likes),
            other => Err(AppError::InvalidInput(format!(
                "sortBy must be 'year' or 'likes', got '{}'",
                other
            ))),
        }
    }
}

pub async fn create_director(store: &dyn Storage, new: NewDirector) -> AppResult<Director> {
    if new.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "director name must not be blank".to_string(),
        ));
    }
    store.create_director(new).await
}

pub async fn update_director(store: &dyn Storage, director: Director) -> AppResult<Director> {
    if director.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "director name must not be blank".to_string(),
        ));
    }
    store.update_director(director).await
}

pub async fn get_director(store: &dyn Storage, id: i64) -> AppResult<Director> {
    store.get_director(id).await
}

pub async fn list_directors(store: &dyn Storage) -> AppResult<Vec<Director>> {
    store.list_directors().await
}

pub async fn delete_director(store: &dyn Storage, id: i64) -> AppResult<()> {
    if store.delete_director(id).await? {
        Ok(())
    } else {
        Err(AppError::director_not_found(id))
    }
}

/// A director's films, sorted by release year or global like count.
pub async fn films_by_director(
    store: &dyn Storage,
    director_id: i64,
    sort: DirectorFilmSort,
) -> AppResult<Vec<Film>> {
    if !store.director_exists(director_id).await? {
        return Err(AppError::director_not_found(director_id));
    }

    let mut films: Vec<Film> = store
        .list_films()
        .await?
        .into_iter()
        .filter(|film| film.director_ids.contains(&director_id))
        .collect();

    match sort {
        DirectorFilmSort::Year => {
            films.sort_by(|a, b| a.release_date.cmp(&b.release_date).then(a.id.cmp(&b.id)));
        }
        DirectorFilmSort::Likes => {
            let counts = store.like_counts().await?;
            films.sort_by(|a, b| {
                let likes_a = counts.get(&a.id).copied().unwrap_or(0);
                let likes_b = counts.get(&b.id).copied().unwrap_or(0);
                likes_b.cmp(&likes_a).then(a.id.cmp(&b.id))
            });
        }
    }
    Ok(films)
}
