use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};

use chatgate_auth::Principal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::PROFILE) {
        return errors::service_error_response(e);
    }
    let user = services
        .identity
        .current_user(&caller)
        .await
        .map(dto::UserResponse::from);
    errors::respond(StatusCode::OK, user)
}
