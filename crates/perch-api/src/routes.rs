use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::{self, AppState};
use crate::messages;
use crate::middleware::require_auth;
use crate::users;

/// Assemble the route tree. Shared by the server binary and the
/// integration tests, so both exercise the same middleware stack.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/messages/{id}", get(messages::get_message))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/users/{id}/following", get(users::following))
        .route("/users/{id}/followers", get(users::followers))
        .route(
            "/users/{id}/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/users/{id}/likes", get(users::likes))
        .route("/users/{id}", delete(users::delete_user))
        .route("/messages", post(messages::create_message))
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/messages/{id}/like", post(messages::toggle_like))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}
