use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    Json,
};

use chatgate_auth::Principal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> Response {
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let session = services
        .identity
        .register(body.into())
        .await
        .map(dto::AuthResponse::from);
    errors::respond(StatusCode::CREATED, session)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Response {
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let session = services
        .identity
        .login(&body.email, &body.password)
        .await
        .map(dto::AuthResponse::from);
    errors::respond(StatusCode::OK, session)
}

/// Client token for talking to the chat provider directly.
pub async fn provider_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::PROFILE) {
        return errors::service_error_response(e);
    }
    errors::respond(StatusCode::OK, services.identity.provider_token(&caller))
}
