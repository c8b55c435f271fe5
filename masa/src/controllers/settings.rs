use axum::extract::State;
use axum::routing::get;
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::OrgDocument;
use masa_security::StaffUser;
use serde_json::Value;

use super::Body;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/settings", get(get_settings).patch(patch_settings))
        .route("/api/dashboard/theme", get(get_theme).patch(patch_theme))
        .route("/api/dashboard/legal", get(get_legal).patch(patch_legal))
}

async fn read(state: &AppState, user: &StaffUser, document: OrgDocument) -> ActionResult<ApiResponse<Value>> {
    let organization_id = user.organization()?;
    Ok(ApiResponse::ok(state.organizations.document(organization_id, document).await?))
}

/// Owners only.
async fn write(
    state: &AppState,
    user: &StaffUser,
    document: OrgDocument,
    patch: Value,
) -> ActionResult<ApiResponse<Value>> {
    user.require_manager()?;
    let organization_id = user.organization()?;
    Ok(ApiResponse::ok(
        state.organizations.patch_document(organization_id, document, patch).await?,
    ))
}

async fn get_settings(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Value>> {
    read(&state, &user, OrgDocument::Settings).await
}

async fn patch_settings(
    State(state): State<AppState>,
    user: StaffUser,
    Body(patch): Body<Value>,
) -> ActionResult<ApiResponse<Value>> {
    write(&state, &user, OrgDocument::Settings, patch).await
}

async fn get_theme(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Value>> {
    read(&state, &user, OrgDocument::Theme).await
}

async fn patch_theme(
    State(state): State<AppState>,
    user: StaffUser,
    Body(patch): Body<Value>,
) -> ActionResult<ApiResponse<Value>> {
    write(&state, &user, OrgDocument::Theme, patch).await
}

async fn get_legal(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Value>> {
    read(&state, &user, OrgDocument::Legal).await
}

async fn patch_legal(
    State(state): State<AppState>,
    user: StaffUser,
    Body(patch): Body<Value>,
) -> ActionResult<ApiResponse<Value>> {
    write(&state, &user, OrgDocument::Legal, patch).await
}
