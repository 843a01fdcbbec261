use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;

use chatgate_auth::Principal;
use chatgate_channels::NewChannel;
use chatgate_core::{ChannelId, UserId};
use chatgate_infra::scope::parse_id;
use chatgate_infra::ServiceResult;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_channel).get(list_channels))
        .route("/:id/members", post(add_member).get(list_members))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/join", post(join_channel))
        .route("/:id/leave", post(leave_channel))
}

pub async fn create_channel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    payload: Result<Json<dto::CreateChannelRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::CHANNEL_CREATE) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let new = NewChannel::new(
        &body.name,
        body.description.as_deref(),
        caller.tenant_id,
        caller.user_id,
    );
    let channel = match new {
        Ok(new) => services.membership.create_channel_with_stream_backing(new).await,
        Err(e) => Err(e.into()),
    };
    errors::respond(StatusCode::CREATED, channel.map(dto::ChannelResponse::from))
}

pub async fn list_channels(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::CHANNEL_READ) {
        return errors::service_error_response(e);
    }
    let channels = services
        .membership
        .list_channels(caller.tenant_id)
        .await
        .map(dto::list::<_, dto::ChannelResponse>);
    errors::respond(StatusCode::OK, channels)
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AddMemberRequest>, JsonRejection>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MEMBER_MANAGE) {
        return errors::service_error_response(e);
    }
    let body = match errors::body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let added = add(&services, &caller, &id, &body.user_id).await;
    errors::respond(StatusCode::CREATED, added)
}

pub async fn remove_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path((id, user_id)): Path<(String, String)>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MEMBER_MANAGE) {
        return errors::service_error_response(e);
    }
    errors::respond(StatusCode::OK, remove(&services, &caller, &id, &user_id).await)
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::CHANNEL_READ) {
        return errors::service_error_response(e);
    }
    let members = match parse_id::<ChannelId>(&id) {
        Ok(id) => services.membership.list_members(id, caller.tenant_id).await,
        Err(e) => Err(e),
    };
    errors::respond(StatusCode::OK, members.map(dto::list::<_, dto::UserResponse>))
}

pub async fn join_channel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MEMBER_SELF) {
        return errors::service_error_response(e);
    }
    let joined = add(&services, &caller, &id, &caller.user_id.to_string()).await;
    errors::respond(StatusCode::OK, joined)
}

pub async fn leave_channel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = authz::require(&caller, authz::MEMBER_SELF) {
        return errors::service_error_response(e);
    }
    let left = remove(&services, &caller, &id, &caller.user_id.to_string()).await;
    errors::respond(StatusCode::OK, left)
}

async fn add(
    services: &AppServices,
    caller: &Principal,
    channel_id: &str,
    user_id: &str,
) -> ServiceResult<serde_json::Value> {
    let channel_id = parse_id::<ChannelId>(channel_id)?;
    let user_id = parse_id::<UserId>(user_id)?;
    let member = services
        .membership
        .add_member(channel_id, user_id, caller.tenant_id)
        .await?;
    Ok(json!({
        "channel_id": member.channel_id.to_string(),
        "user_id": member.user_id.to_string(),
        "joined_at": member.joined_at,
    }))
}

async fn remove(
    services: &AppServices,
    caller: &Principal,
    channel_id: &str,
    user_id: &str,
) -> ServiceResult<serde_json::Value> {
    let channel_id = parse_id::<ChannelId>(channel_id)?;
    let user_id = parse_id::<UserId>(user_id)?;
    services
        .membership
        .remove_member(channel_id, user_id, caller.tenant_id)
        .await?;
    Ok(json!({ "removed": true }))
}
