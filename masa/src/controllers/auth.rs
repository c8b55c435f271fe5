use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::Profile;
use masa_security::StaffUser;
use serde_json::{json, Value};

use super::Body;
use crate::services::auth::{LoginRequest, RegisterRequest, ResetConfirm, ResetRequest, Session};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/password-reset/request", post(request_reset))
        .route("/api/auth/password-reset/confirm", post(confirm_reset))
}

async fn register(
    State(state): State<AppState>,
    Body(body): Body<RegisterRequest>,
) -> ActionResult<ApiResponse<Session>> {
    Ok(ApiResponse::created(state.auth.register(body).await?))
}

async fn login(State(state): State<AppState>, Body(body): Body<LoginRequest>) -> ActionResult<ApiResponse<Session>> {
    Ok(ApiResponse::ok(state.auth.login(body).await?))
}

async fn me(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Profile>> {
    Ok(ApiResponse::ok(state.auth.me(&user).await?))
}

async fn request_reset(
    State(state): State<AppState>,
    Body(body): Body<ResetRequest>,
) -> ActionResult<ApiResponse<Value>> {
    state.auth.request_reset(body).await?;
    Ok(ApiResponse::accepted(json!({ "sent": true })))
}

async fn confirm_reset(
    State(state): State<AppState>,
    Body(body): Body<ResetConfirm>,
) -> ActionResult<ApiResponse<Value>> {
    state.auth.confirm_reset(body).await?;
    Ok(ApiResponse::ok(json!({ "reset": true })))
}
