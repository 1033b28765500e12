use super::common::{json_body, success_response};
use crate::{
    auth::{authorize, Operation, Principal},
    errors::ApiError,
    services::dispensing::{DispenseCommand, DispenseResult},
    ApiResponse, AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};

#[utoipa::path(
    post,
    path = "/api/v1/dispense",
    summary = "Dispense medication",
    description = "Dispenses part or all of a prescription, draws the stock and records the payment in one transaction",
    request_body = DispenseCommand,
    responses(
        (status = 200, description = "Medication dispensed", body = ApiResponse<DispenseResult>),
        (status = 400, description = "Invalid quantity or payment", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Prescription or stock item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Prescription already closed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "dispensing"
)]
pub async fn dispense(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<DispenseCommand>, JsonRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::Dispense)?;
    let command = json_body(payload)?;

    let result = state
        .services
        .dispensing
        .dispense(command, principal.actor_id)
        .await?;
    Ok(success_response(result))
}
