use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{post, put},
    Json, Router,
};
use serde_json::json;

use chatgate_auth::Principal;
use chatgate_core::UserId;
use chatgate_infra::scope::parse_id;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", put(update_user).delete(delete_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::USER_WRITE) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let user = match body.into_input() {
        Ok(input) => services.directory.create_user(&caller, input).await,
        Err(e) => Err(e),
    };
    errors::respond(StatusCode::CREATED, user.map(dto::UserResponse::from))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::USER_READ) {
        return errors::service_error_response(e);
    }
    let users = services
        .directory
        .list_users(&caller)
        .await
        .map(dto::list::<_, dto::UserResponse>);
    errors::respond(StatusCode::OK, users)
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateUserRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::USER_WRITE) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(e) => return errors::service_error_response(e),
    };
    let user = match body.into_patch() {
        Ok(patch) => services.directory.update_user(&caller, id, patch).await,
        Err(e) => Err(e),
    };
    errors::respond(StatusCode::OK, user.map(dto::UserResponse::from))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::USER_DELETE) {
        return errors::service_error_response(e);
    }
    let deleted = match parse_id::<UserId>(&id) {
        Ok(id) => services.directory.delete_user(&caller, id).await,
        Err(e) => Err(e),
    };
    errors::respond(StatusCode::OK, deleted.map(|()| json!({ "deleted": true })))
}
