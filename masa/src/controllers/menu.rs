use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::ServiceRequest;
use masa_rate_limit::throttle_clients;
use serde_json::Value;

use super::Body;
use crate::services::service_requests::CreateServiceRequest;
use crate::state::AppState;

/// Guest-facing routes. Every route is throttled per client address.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/menu/{slug}", get(menu))
        .route("/api/menu/{slug}/tables/{qr_token}", get(landing))
        .route("/api/menu/{slug}/legal", get(legal))
        .route("/api/service-requests", post(create_service_request))
        .route_layer(from_fn_with_state(state.throttle.clone(), throttle_clients))
}

async fn menu(State(state): State<AppState>, Path(slug): Path<String>) -> ActionResult<ApiResponse<Value>> {
    Ok(ApiResponse::ok(state.menu.menu(&slug).await?))
}

async fn landing(
    State(state): State<AppState>,
    Path((slug, qr_token)): Path<(String, String)>,
) -> ActionResult<ApiResponse<Value>> {
    Ok(ApiResponse::ok(state.menu.landing(&slug, &qr_token).await?))
}

async fn legal(State(state): State<AppState>, Path(slug): Path<String>) -> ActionResult<ApiResponse<Value>> {
    Ok(ApiResponse::ok(state.menu.legal(&slug).await?))
}

async fn create_service_request(
    State(state): State<AppState>,
    Body(body): Body<CreateServiceRequest>,
) -> ActionResult<ApiResponse<ServiceRequest>> {
    Ok(ApiResponse::created(state.requests.create(body).await?))
}
