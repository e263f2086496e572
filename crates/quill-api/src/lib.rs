pub mod auth;
pub mod error;
pub mod middleware;
pub mod password;
pub mod posts;
pub mod token;
pub mod users;
pub mod votes;

mod convert;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post},
};

use quill_types::api::MessageResponse;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All routes, with the bearer-token check layered over the protected ones.
/// Collection routes answer with and without the trailing slash.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/login", post(auth::login))
        .route("/users/", post(users::create_user))
        .route("/users", post(users::create_user))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/users/{id}", get(users::get_user))
        .route("/posts/", get(posts::list_posts).post(posts::create_post))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/vote/", post(votes::cast_vote))
        .route("/vote", post(votes::cast_vote))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("welcome to my api!"))
}
