use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use futures_util::Stream;
use masa_core::{ActionResult, ApiResponse};
use masa_data::{Pageable, RequestStatus, ServiceRequest, Transition};
use masa_realtime::{sse_stream, MonitorSnapshot};
use masa_security::StaffUser;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{Params, PathId};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/service-requests", get(list))
        .route("/api/dashboard/service-requests/stream", get(stream))
        .route("/api/dashboard/service-requests/summary", get(summary))
        .route("/api/dashboard/service-requests/summary/reconnect", post(reconnect))
        .route("/api/dashboard/service-requests/{id}", get(find))
        .route("/api/dashboard/service-requests/{id}/acknowledge", post(acknowledge))
        .route("/api/dashboard/service-requests/{id}/start", post(start))
        .route("/api/dashboard/service-requests/{id}/complete", post(complete))
        .route("/api/dashboard/service-requests/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<RequestStatus>,
    page: Option<u64>,
    size: Option<u64>,
}

async fn list(
    State(state): State<AppState>,
    user: StaffUser,
    Params(params): Params<ListParams>,
) -> ActionResult<ApiResponse<Value>> {
    let defaults = Pageable::default();
    let pageable = Pageable::new(params.page.unwrap_or(defaults.page), params.size.unwrap_or(defaults.size));
    Ok(ApiResponse::ok(state.requests.list(&user, params.status, pageable).await?))
}

async fn find(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    Ok(ApiResponse::ok(state.requests.get(&user, id).await?))
}

async fn transition(
    state: &AppState,
    user: &StaffUser,
    id: Uuid,
    transition: Transition,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    Ok(ApiResponse::ok(state.requests.transition(user, id, transition).await?))
}

async fn acknowledge(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    transition(&state, &user, id, Transition::Acknowledge).await
}

async fn start(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    transition(&state, &user, id, Transition::Start).await
}

async fn complete(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    transition(&state, &user, id, Transition::Complete).await
}

async fn cancel(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    transition(&state, &user, id, Transition::Cancel).await
}

/// Live row changes of the caller's organization.
async fn stream(
    State(state): State<AppState>,
    user: StaffUser,
) -> ActionResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let organization_id = user.organization()?;
    tracing::debug!(%organization_id, user = %user.id, "Dashboard stream opened");
    let subscription = state.feed.subscribe(organization_id);
    Ok(Sse::new(sse_stream(subscription)).keep_alive(KeepAlive::default()))
}

/// Pending counter, connection state and latest request for the badge.
async fn summary(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<MonitorSnapshot>> {
    let monitor = state.monitors.get_or_start(user.organization()?).await?;
    Ok(ApiResponse::ok(monitor.snapshot()))
}

async fn reconnect(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<MonitorSnapshot>> {
    let monitor = state.monitors.reconnect(user.organization()?).await?;
    Ok(ApiResponse::ok(monitor.snapshot()))
}
