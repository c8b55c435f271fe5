use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::{Organization, Profile};
use masa_security::StaffUser;
use serde_json::{json, Value};

use super::{Body, PathId};
use crate::services::admin::{CreateUser, SetPassword};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/users/{id}/superadmin", post(promote).delete(demote))
        .route("/api/admin/users/{id}/reset-password", post(reset_password))
        .route("/api/admin/organizations", get(list_organizations))
}

async fn list_users(State(state): State<AppState>, admin: StaffUser) -> ActionResult<ApiResponse<Vec<Profile>>> {
    Ok(ApiResponse::ok(state.admin.list_users(&admin).await?))
}

async fn create_user(
    State(state): State<AppState>,
    admin: StaffUser,
    Body(body): Body<CreateUser>,
) -> ActionResult<ApiResponse<Profile>> {
    Ok(ApiResponse::created(state.admin.create_user(&admin, body).await?))
}

async fn promote(
    State(state): State<AppState>,
    admin: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<Profile>> {
    Ok(ApiResponse::ok(state.admin.promote(&admin, id).await?))
}

async fn demote(
    State(state): State<AppState>,
    admin: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<Profile>> {
    Ok(ApiResponse::ok(state.admin.demote(&admin, id).await?))
}

async fn reset_password(
    State(state): State<AppState>,
    admin: StaffUser,
    PathId(id): PathId,
    Body(body): Body<SetPassword>,
) -> ActionResult<ApiResponse<Value>> {
    state.admin.reset_password(&admin, id, body).await?;
    Ok(ApiResponse::ok(json!({ "reset": true })))
}

async fn list_organizations(
    State(state): State<AppState>,
    admin: StaffUser,
) -> ActionResult<ApiResponse<Vec<Organization>>> {
    Ok(ApiResponse::ok(state.admin.list_organizations(&admin).await?))
}
