use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use chatgate_infra::{ServiceError, ServiceResult};

/// Map a service failure to its HTTP response.
///
/// Server-side failures are logged in full and answered with a generic
/// message; every other variant carries its own text.
pub fn service_error_response(err: ServiceError) -> Response {
    let (status, code) = match &err {
        ServiceError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
        ServiceError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
        ServiceError::Unauthorized => (StatusCode::FORBIDDEN, "forbidden"),
        ServiceError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ServiceError::AlreadyMember => (StatusCode::CONFLICT, "already_member"),
        ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        ServiceError::RemoteSyncFailed(_) => (StatusCode::BAD_GATEWAY, "remote_sync_failed"),
        ServiceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };

    if err.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "request failed");
        let message = match err {
            ServiceError::RemoteSyncFailed(_) => "chat provider request failed",
            _ => "internal server error",
        };
        return json_error(status, code, message);
    }

    json_error(status, code, err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Serialize a successful result with `status`, or map the error.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => service_error_response(err),
    }
}

/// Unwrap a JSON body, answering 400 for anything axum could not decode.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text()))
}
