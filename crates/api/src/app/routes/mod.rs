use axum::{
    routing::{get, post},
    Router,
};

pub mod auth;
pub mod channels;
pub mod messages;
pub mod system;
pub mod tenants;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/stream/token", get(auth::provider_token))
        .nest("/tenants", tenants::router())
        .nest("/users", users::router())
        .nest("/channels", channels::router())
        .nest("/messages", messages::router())
}
