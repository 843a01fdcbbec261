//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/provider wiring and the use-case services
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use chatgate_auth::TokenService;
use chatgate_infra::{AppConfig, ServiceResult};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> ServiceResult<Router> {
    let tokens = Arc::new(TokenService::new(config.jwt_secret.as_bytes()));
    let services = Arc::new(services::build_services(config, tokens.clone()).await?);
    Ok(build_router(services, tokens))
}

/// Router over already-wired services; tests drive this with in-memory
/// adapters.
pub fn build_router(services: Arc<AppServices>, tokens: Arc<TokenService>) -> Router {
    let auth_state = middleware::AuthState { jwt: tokens };

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services.clone())),
    );

    Router::new()
        .merge(routes::public_router())
        .layer(Extension(services))
        .merge(protected)
}
