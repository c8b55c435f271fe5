use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::Table;
use masa_security::StaffUser;
use serde_json::{json, Value};

use super::{Body, PathId};
use crate::services::tables::{CreateTable, TableQr, UpdateTable};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/tables", get(list).post(create))
        .route("/api/dashboard/tables/{id}", get(find).put(update).patch(update).delete(remove))
        .route("/api/dashboard/tables/{id}/qr", get(qr))
        .route("/api/dashboard/tables/{id}/qr/rotate", post(rotate_qr))
}

async fn list(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Vec<Table>>> {
    Ok(ApiResponse::ok(state.tables.list(&user).await?))
}

async fn find(State(state): State<AppState>, user: StaffUser, PathId(id): PathId) -> ActionResult<ApiResponse<Table>> {
    Ok(ApiResponse::ok(state.tables.get(&user, id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: StaffUser,
    Body(body): Body<CreateTable>,
) -> ActionResult<ApiResponse<Table>> {
    Ok(ApiResponse::created(state.tables.create(&user, body).await?))
}

async fn update(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
    Body(body): Body<UpdateTable>,
) -> ActionResult<ApiResponse<Table>> {
    Ok(ApiResponse::ok(state.tables.update(&user, id, body).await?))
}

async fn remove(State(state): State<AppState>, user: StaffUser, PathId(id): PathId) -> ActionResult<ApiResponse<Value>> {
    state.tables.delete(&user, id).await?;
    Ok(ApiResponse::ok(json!({ "deleted": true })))
}

async fn qr(State(state): State<AppState>, user: StaffUser, PathId(id): PathId) -> ActionResult<ApiResponse<TableQr>> {
    Ok(ApiResponse::ok(state.tables.qr(&user, id).await?))
}

async fn rotate_qr(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<TableQr>> {
    Ok(ApiResponse::ok(state.tables.rotate_qr(&user, id).await?))
}
