use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use chatgate_auth::JwtValidator;
use chatgate_infra::ServiceError;

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Verify the bearer token and attach the caller's
/// [`Principal`](chatgate_auth::Principal) to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = match extract_bearer(req.headers())
        .and_then(|token| state.jwt.validate(token, Utc::now()).map_err(ServiceError::from))
    {
        Ok(principal) => principal,
        Err(err) => return errors::service_error_response(err),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ServiceError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(ServiceError::InvalidToken)?;

    let header = header.to_str().map_err(|_| ServiceError::InvalidToken)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(ServiceError::InvalidToken)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(ServiceError::InvalidToken);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn malformed_headers_are_invalid_tokens() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(ServiceError::InvalidToken));
        assert_eq!(extract_bearer(&headers("Basic abc")), Err(ServiceError::InvalidToken));
        assert_eq!(extract_bearer(&headers("Bearer   ")), Err(ServiceError::InvalidToken));
    }
}
