use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};

use chatgate_auth::Principal;
use chatgate_core::TenantId;
use chatgate_infra::scope::parse_id;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_tenant).get(list_tenants))
        .route("/:id", get(get_tenant))
}

pub async fn create_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<dto::CreateTenantRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::TENANT_CREATE) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let tenant = services
        .directory
        .create_tenant(&body.name)
        .await
        .map(dto::TenantResponse::from);
    errors::respond(StatusCode::CREATED, tenant)
}

pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::TENANT_READ) {
        return errors::service_error_response(e);
    }
    let tenants = services
        .directory
        .list_tenants()
        .await
        .map(dto::list::<_, dto::TenantResponse>);
    errors::respond(StatusCode::OK, tenants)
}

pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::TENANT_READ) {
        return errors::service_error_response(e);
    }
    let tenant = match parse_id::<TenantId>(&id) {
        Ok(id) => services.directory.get_tenant(id).await,
        Err(e) => Err(e),
    };
    errors::respond(StatusCode::OK, tenant.map(dto::TenantResponse::from))
}
