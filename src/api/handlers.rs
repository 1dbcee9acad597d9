use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::store::{FilmStore, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    Director, FeedEvent, Film, NewDirector, NewFilm, NewReview, NewUser, Review, User,
};
use crate::services::{directors, feed, ranking, recommendations, reviews, social};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub count: Option<i64>,
    pub genre_id: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CommonFilmsParams {
    pub user_id: i64,
    pub friend_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DirectorFilmsParams {
    #[serde(rename = "sortBy")]
    pub sort_by: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewListParams {
    pub film_id: i64,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewUpdateRequest {
    pub review_id: i64,
    pub content: String,
    pub is_positive: bool,
}

const DEFAULT_POPULAR_COUNT: i64 = 10;
const DEFAULT_REVIEW_COUNT: usize = 10;

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

// Users

pub async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.store.create_user(new).await?;
    tracing::info!(user_id = user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    Ok(Json(state.store.get_user(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewUser>,
) -> AppResult<Json<User>> {
    let user = User {
        id,
        email: new.email,
        login: new.login,
        name: new.name,
        birthday: new.birthday,
    };
    Ok(Json(state.store.update_user(user).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.store.delete_user(id).await? {
        tracing::info!(user_id = id, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::user_not_found(id))
    }
}

// Friendships

pub async fn add_friend(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(i64, i64)>,
) -> AppResult<Json<User>> {
    let user = social::add_friend(state.store.as_ref(), &state.feed, id, friend_id).await?;
    Ok(Json(user))
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(i64, i64)>,
) -> AppResult<Json<User>> {
    let user = social::remove_friend(state.store.as_ref(), &state.feed, id, friend_id).await?;
    Ok(Json(user))
}

pub async fn get_friends(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(social::get_friends(state.store.as_ref(), id).await?))
}

pub async fn get_common_friends(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(i64, i64)>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(
        social::get_common_friends(state.store.as_ref(), id, other_id).await?,
    ))
}

// Films

pub async fn create_film(
    State(state): State<AppState>,
    Json(new): Json<NewFilm>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state.store.create_film(new).await?;
    tracing::info!(film_id = film.id, "film created");
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn get_films(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.store.list_films().await?))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.store.get_film(id).await?))
}

pub async fn update_film(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewFilm>,
) -> AppResult<Json<Film>> {
    let film = Film {
        id,
        name: new.name,
        description: new.description,
        release_date: new.release_date,
        duration: new.duration,
        genre_ids: new.genre_ids,
        director_ids: new.director_ids,
    };
    Ok(Json(state.store.update_film(film).await?))
}

pub async fn delete_film(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    if state.store.delete_film(id).await? {
        tracing::info!(film_id = id, "film deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::film_not_found(id))
    }
}

// Likes

pub async fn add_like(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(i64, i64)>,
) -> AppResult<Json<Film>> {
    let film = social::add_like(state.store.as_ref(), &state.feed, film_id, user_id).await?;
    Ok(Json(film))
}

pub async fn remove_like(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(i64, i64)>,
) -> AppResult<Json<Film>> {
    let film = social::remove_like(state.store.as_ref(), &state.feed, film_id, user_id).await?;
    Ok(Json(film))
}

// Directors

pub async fn create_director(
    State(state): State<AppState>,
    Json(new): Json<NewDirector>,
) -> AppResult<(StatusCode, Json<Director>)> {
    let director = directors::create_director(state.store.as_ref(), new).await?;
    tracing::info!(director_id = director.id, "director created");
    Ok((StatusCode::CREATED, Json(director)))
}

pub async fn get_directors(State(state): State<AppState>) -> AppResult<Json<Vec<Director>>> {
    Ok(Json(directors::list_directors(state.store.as_ref()).await?))
}

pub async fn get_director(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Director>> {
    Ok(Json(directors::get_director(state.store.as_ref(), id).await?))
}

pub async fn update_director(
    State(state): State<AppState>,
    Json(director): Json<Director>,
) -> AppResult<Json<Director>> {
    Ok(Json(
        directors::update_director(state.store.as_ref(), director).await?,
    ))
}

pub async fn delete_director(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    directors::delete_director(state.store.as_ref(), id).await?;
    tracing::info!(director_id = id, "director deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn director_films(
    State(state): State<AppState>,
    Path(director_id): Path<i64>,
    Query(params): Query<DirectorFilmsParams>,
) -> AppResult<Json<Vec<Film>>> {
    let sort = params.sort_by.parse()?;
    let films = directors::films_by_director(state.store.as_ref(), director_id, sort).await?;
    Ok(Json(films))
}

// Rankings & recommendations

pub async fn popular_films(
    State(state): State<AppState>,
    Query(params): Query<PopularParams>,
) -> AppResult<Json<Vec<Film>>> {
    let films = ranking::popular_films(
        state.store.as_ref(),
        params.count.unwrap_or(DEFAULT_POPULAR_COUNT),
        params.genre_id,
        params.year,
    )
    .await?;
    Ok(Json(films))
}

pub async fn common_films(
    State(state): State<AppState>,
    Query(params): Query<CommonFilmsParams>,
) -> AppResult<Json<Vec<Film>>> {
    let films =
        ranking::common_films(state.store.as_ref(), params.user_id, params.friend_id).await?;
    Ok(Json(films))
}

pub async fn recommend_films(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(
        recommendations::recommend(state.store.as_ref(), id).await?,
    ))
}

// Feed

pub async fn user_feed(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<FeedEvent>>> {
    Ok(Json(feed::get_user_feed(state.store.as_ref(), id).await?))
}

// Reviews

pub async fn create_review(
    State(state): State<AppState>,
    Json(new): Json<NewReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = reviews::create_review(state.store.as_ref(), &state.feed, new).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    State(state): State<AppState>,
    Json(request): Json<ReviewUpdateRequest>,
) -> AppResult<Json<Review>> {
    let review = reviews::update_review(
        state.store.as_ref(),
        &state.feed,
        request.review_id,
        request.content,
        request.is_positive,
    )
    .await?;
    Ok(Json(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    reviews::delete_review(state.store.as_ref(), &state.feed, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Review>> {
    Ok(Json(reviews::get_review(state.store.as_ref(), id).await?))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewListParams>,
) -> AppResult<Json<Vec<Review>>> {
    let list = reviews::reviews_for_film(
        state.store.as_ref(),
        params.film_id,
        params.count.unwrap_or(DEFAULT_REVIEW_COUNT),
    )
    .await?;
    Ok(Json(list))
}
