use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use chatgate_auth::Principal;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(send_message))
        .route("/:remote_id", get(query_messages))
}

pub async fn send_message(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<dto::SendMessageRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MESSAGE_ACCESS) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let sent = services
        .messaging
        .send_message(&caller, &body.remote_id, &body.text)
        .await;
    errors::respond(StatusCode::CREATED, sent)
}

pub async fn query_messages(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(remote_id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MESSAGE_ACCESS) {
        return errors::service_error_response(e);
    }
    let messages = services
        .messaging
        .query_messages(&caller, &remote_id)
        .await
        .map(|messages| dto::MessagesResponse { messages });
    errors::respond(StatusCode::OK, messages)
}
