use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::request_id;

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Users
        .route("/users", post(handlers::create_user))
        .route("/users", get(handlers::get_users))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id", put(handlers::update_user))
        .route("/users/:id", delete(handlers::delete_user))
        // Friendships
        .route("/users/:id/friends/:friend_id", put(handlers::add_friend))
        .route("/users/:id/friends/:friend_id", delete(handlers::remove_friend))
        .route("/users/:id/friends", get(handlers::get_friends))
        .route(
            "/users/:id/friends/common/:other_id",
            get(handlers::get_common_friends),
        )
        // Recommendations & feed
        .route("/users/:id/recommendations", get(handlers::recommend_films))
        .route("/users/:id/feed", get(handlers::user_feed))
        // Films
        .route("/films", post(handlers::create_film))
        .route("/films", get(handlers::get_films))
        .route("/films/popular", get(handlers::popular_films))
        .route("/films/common", get(handlers::common_films))
        .route("/films/:id", get(handlers::get_film))
        .route("/films/:id", put(handlers::update_film))
        .route("/films/:id", delete(handlers::delete_film))
        .route("/films/director/:director_id", get(handlers::director_films))
        // Likes
        .route("/films/:id/like/:user_id", put(handlers::add_like))
        .route("/films/:id/like/:user_id", delete(handlers::remove_like))
        // Directors
        .route("/directors", post(handlers::create_director))
        .route("/directors", put(handlers::update_director))
        .route("/directors", get(handlers::get_directors))
        .route("/directors/:id", get(handlers::get_director))
        .route("/directors/:id", delete(handlers::delete_director))
        // Reviews
        .route("/reviews", post(handlers::create_review))
        .route("/reviews", put(handlers::update_review))
        .route("/reviews", get(handlers::list_reviews))
        .route("/reviews/:id", get(handlers::get_review))
        .route("/reviews/:id", delete(handlers::delete_review))
        .layer(TraceLayer::new_for_http().make_span_with(request_id::make_span))
        .layer(middleware::from_fn(request_id::tag_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
