use super::common::success_response;
use crate::{
    auth::{authorize, Operation, Principal},
    entities::stock_item,
    errors::ApiError,
    services::reports::{ExpiringItemRow, InsuranceReportRow, UsageReportRow},
    ApiResponse, AppState,
};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::IntoParams;

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock-levels", get(stock_levels))
        .route("/medication-usage", get(medication_usage))
        .route("/expiring-medications", get(expiring_medications))
        .route("/insurance-dispensing", get(insurance_dispensing))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StockLevelQuery {
    pub min_stock: Option<Decimal>,
    pub max_stock: Option<Decimal>,
    /// Case-insensitive substring of the item name
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DateRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ExpiringQuery {
    /// Look-ahead in 30-day months; negative values count as zero
    pub months: Option<i64>,
    /// Only items holding more than this quantity
    pub min_stock: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InsuranceQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub patient_id: Option<i32>,
    /// Case-insensitive substring of the policy number
    pub policy_number: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/stock-levels",
    summary = "Stock level report",
    params(StockLevelQuery),
    responses(
        (status = 200, description = "Matching stock items by name", body = ApiResponse<Vec<stock_item::Model>>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "reports"
)]
pub async fn stock_levels(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<StockLevelQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::StockLevelReport)?;
    let Query(query) = query?;

    let rows = state
        .services
        .reports
        .stock_levels(query.min_stock, query.max_stock, query.name)
        .await?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/medication-usage",
    summary = "Medication usage report",
    description = "Quantities dispensed per stock item between two dates, inclusive",
    params(DateRangeQuery),
    responses(
        (status = 200, description = "Usage per item by name", body = ApiResponse<Vec<UsageReportRow>>),
        (status = 400, description = "Invalid date range", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "reports"
)]
pub async fn medication_usage(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::UsageReport)?;
    let Query(query) = query?;

    let rows = state
        .services
        .reports
        .medication_usage(query.start_date, query.end_date)
        .await?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/expiring-medications",
    summary = "Expiring medications report",
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Items by expiry date", body = ApiResponse<Vec<ExpiringItemRow>>),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "reports"
)]
pub async fn expiring_medications(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<ExpiringQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::ExpiringReport)?;
    let Query(query) = query?;

    let rows = state
        .services
        .reports
        .expiring_medications(query.months, query.min_stock)
        .await?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/insurance-dispensing",
    summary = "Insurance dispensing report",
    params(InsuranceQuery),
    responses(
        (status = 200, description = "Insurance payments, newest first", body = ApiResponse<Vec<InsuranceReportRow>>),
        (status = 400, description = "Invalid date range", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "reports"
)]
pub async fn insurance_dispensing(
    State(state): State<AppState>,
    principal: Principal,
    query: Result<Query<InsuranceQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    authorize(&principal, Operation::InsuranceReport)?;
    let Query(query) = query?;

    let rows = state
        .services
        .reports
        .insurance_dispensing(
            query.start_date,
            query.end_date,
            query.patient_id,
            query.policy_number,
        )
        .await?;
    Ok(success_response(rows))
}
