use super::common::{created_response, json_body, success_response, validate_input};
use crate::{
    auth::{authorize, Operation, Principal},
    entities::{order, order_history},
    errors::ApiError,
    services::procurement::{ChangeOrderStatusCommand, OrderDetail, PlaceOrderCommand},
    ApiResponse, AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/receive", post(receive_order))
        .route("/:id/status", post(update_order_status))
        .route("/:id/history", get(order_history))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Creates a supplier order, pricing each line from the supplier's negotiated price or the item's purchase price",
    request_body = PlaceOrderCommand,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderDetail>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier or stock item not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "No price defined for a line", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<PlaceOrderCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::PlaceOrder)?;
    let command = json_body(payload)?;
    validate_input(&command)?;

    let detail = state
        .services
        .procurement
        .place_order(command, principal.facility_id, principal.actor_id)
        .await?;
    Ok(created_response(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its line items", body = ApiResponse<OrderDetail>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ViewOrders)?;
    let detail = state.services.procurement.get_order(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/receive",
    summary = "Receive order",
    description = "Books every line into stock and completes the order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order received", body = ApiResponse<OrderDetail>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order cannot be received in its current status", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn receive_order(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageOrders)?;
    let detail = state
        .services
        .procurement
        .receive_order(id, principal.actor_id)
        .await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/status",
    summary = "Change order status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = ChangeOrderStatusCommand,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<order::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    payload: Result<Json<ChangeOrderStatusCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ManageOrders)?;
    let command = json_body(payload)?;
    validate_input(&command)?;

    let order = state
        .services
        .procurement
        .update_status(id, command, principal.actor_id)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/history",
    summary = "Order history",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Lifecycle entries, oldest first", body = ApiResponse<Vec<order_history::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ViewOrders)?;
    let history = state.services.audit_trail.order_history(id).await?;
    Ok(success_response(history))
}
