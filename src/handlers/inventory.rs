use super::common::{created_response, json_body, success_response, validate_input};
use crate::{
    auth::{authorize, Operation, Principal},
    entities::{inventory_history, stock_item},
    errors::ApiError,
    services::{
        reorder_advisor::ReorderSuggestion,
        stock_ledger::{
            AdjustStockCommand, LedgerEntry, RegisterStockItemCommand, RemovedStockItem,
            UpdateStockItemCommand,
        },
    },
    ApiResponse, AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/reorder-suggestions", get(reorder_suggestions))
        .route("/items", post(register_item))
        .route(
            "/items/:id",
            get(get_item).patch(update_item).delete(remove_item),
        )
        .route("/items/:id/adjust", post(adjust_stock))
        .route("/items/:id/history", get(stock_history))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReorderQuery {
    /// Evaluate expiry against this date instead of today
    pub as_of: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/reorder-suggestions",
    summary = "Reorder suggestions",
    description = "Stock items below their reorder level or expiring within the configured window",
    params(ReorderQuery),
    responses(
        (status = 200, description = "Suggestions ordered by name", body = ApiResponse<Vec<ReorderSuggestion>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn reorder_suggestions(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ReorderQuery>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ViewReorderSuggestions)?;
    let suggestions = state
        .services
        .reorder_advisor
        .list_suggestions(query.as_of)
        .await?;
    Ok(success_response(suggestions))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/items",
    summary = "Register stock item",
    request_body = RegisterStockItemCommand,
    responses(
        (status = 201, description = "Stock item registered", body = ApiResponse<LedgerEntry>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn register_item(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<RegisterStockItemCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageStock)?;
    let command = json_body(payload)?;
    validate_input(&command)?;

    let entry = state
        .services
        .stock_ledger
        .register_item(command, principal.actor_id)
        .await?;
    Ok(created_response(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/items/{id}",
    summary = "Get stock item",
    params(("id" = i32, Path, description = "Stock item id")),
    responses(
        (status = 200, description = "Stock item", body = ApiResponse<stock_item::Model>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn get_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ViewStock)?;
    let item = state.services.stock_ledger.get_item(id).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    patch,
    path = "/api/v1/inventory/items/{id}",
    summary = "Update stock item details",
    description = "Changes descriptive fields and thresholds; stock levels only change through adjustments",
    params(("id" = i32, Path, description = "Stock item id")),
    request_body = UpdateStockItemCommand,
    responses(
        (status = 200, description = "Updated stock item", body = ApiResponse<stock_item::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn update_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    payload: Result<Json<UpdateStockItemCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageStock)?;
    let command = json_body(payload)?;
    validate_input(&command)?;

    let item = state
        .services
        .stock_ledger
        .update_details(id, command, principal.actor_id)
        .await?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/items/{id}",
    summary = "Remove stock item",
    params(("id" = i32, Path, description = "Stock item id")),
    responses(
        (status = 200, description = "Stock item removed", body = ApiResponse<RemovedStockItem>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageStock)?;
    let removed = state
        .services
        .stock_ledger
        .remove_item(id, principal.actor_id)
        .await?;
    Ok(success_response(removed))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/items/{id}/adjust",
    summary = "Adjust stock",
    description = "Applies a signed quantity change and records it in the stock history",
    params(("id" = i32, Path, description = "Stock item id")),
    request_body = AdjustStockCommand,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<LedgerEntry>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    payload: Result<Json<AdjustStockCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageStock)?;
    let command = json_body(payload)?;
    validate_input(&command)?;

    let entry = state
        .services
        .stock_ledger
        .adjust_stock(id, command, principal.actor_id)
        .await?;
    Ok(success_response(entry))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/items/{id}/history",
    summary = "Stock history",
    params(("id" = i32, Path, description = "Stock item id")),
    responses(
        (status = 200, description = "History entries, oldest first", body = ApiResponse<Vec<inventory_history::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock item not found", body = crate::errors::ErrorResponse),
    ),
    tag = "inventory"
)]
pub async fn stock_history(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ViewStockHistory)?;
    let history = state.services.audit_trail.stock_history(id).await?;
    Ok(success_response(history))
}
