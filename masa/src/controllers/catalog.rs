use axum::extract::State;
use axum::routing::{get, put};
use axum::Router;
use masa_core::{ActionResult, ApiResponse};
use masa_data::{Category, Product};
use masa_security::StaffUser;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{Body, Params, PathId};
use crate::services::catalog::{CreateCategory, CreateProduct, UpdateCategory, UpdateProduct};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/categories", get(list_categories).post(create_category))
        .route(
            "/api/dashboard/categories/{id}",
            put(update_category).patch(update_category).delete(delete_category),
        )
        .route("/api/dashboard/products", get(list_products).post(create_product))
        .route(
            "/api/dashboard/products/{id}",
            put(update_product).patch(update_product).delete(delete_product),
        )
        .route("/api/dashboard/products/{id}/availability", put(set_availability))
}

#[derive(Debug, Deserialize)]
struct ProductFilter {
    category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct Availability {
    is_available: bool,
}

async fn list_categories(State(state): State<AppState>, user: StaffUser) -> ActionResult<ApiResponse<Vec<Category>>> {
    Ok(ApiResponse::ok(state.catalog.list_categories(&user).await?))
}

async fn create_category(
    State(state): State<AppState>,
    user: StaffUser,
    Body(body): Body<CreateCategory>,
) -> ActionResult<ApiResponse<Category>> {
    Ok(ApiResponse::created(state.catalog.create_category(&user, body).await?))
}

async fn update_category(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
    Body(body): Body<UpdateCategory>,
) -> ActionResult<ApiResponse<Category>> {
    Ok(ApiResponse::ok(state.catalog.update_category(&user, id, body).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<Value>> {
    state.catalog.delete_category(&user, id).await?;
    Ok(ApiResponse::ok(json!({ "deleted": true })))
}

async fn list_products(
    State(state): State<AppState>,
    user: StaffUser,
    Params(filter): Params<ProductFilter>,
) -> ActionResult<ApiResponse<Vec<Product>>> {
    Ok(ApiResponse::ok(state.catalog.list_products(&user, filter.category_id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    user: StaffUser,
    Body(body): Body<CreateProduct>,
) -> ActionResult<ApiResponse<Product>> {
    Ok(ApiResponse::created(state.catalog.create_product(&user, body).await?))
}

async fn update_product(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
    Body(body): Body<UpdateProduct>,
) -> ActionResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(state.catalog.update_product(&user, id, body).await?))
}

async fn set_availability(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
    Body(body): Body<Availability>,
) -> ActionResult<ApiResponse<Product>> {
    Ok(ApiResponse::ok(state.catalog.set_availability(&user, id, body.is_available).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    user: StaffUser,
    PathId(id): PathId,
) -> ActionResult<ApiResponse<Value>> {
    state.catalog.delete_product(&user, id).await?;
    Ok(ApiResponse::ok(json!({ "deleted": true })))
}
