use crate::AppState;
use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

/// Documents the principal headers supplied by the upstream authenticator.
struct PrincipalHeaders;

impl Modify for PrincipalHeaders {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        for (name, header) in [
            ("ActorId", crate::auth::ACTOR_ID_HEADER),
            ("ActorRole", crate::auth::ACTOR_ROLE_HEADER),
            ("FacilityId", crate::auth::FACILITY_ID_HEADER),
        ] {
            components.add_security_scheme(
                name,
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(header))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HealthLink Pharmacy API",
        version = "1.0.0",
        description = r#"
# HealthLink Pharmacy API

Stock ledger, supplier procurement and prescription dispensing for clinic and
hospital pharmacies.

## Authentication

Requests are authenticated upstream. The acting user arrives as headers:

- `x-actor-id`: user id (UUID)
- `x-actor-role`: one of SuperAdmin, FacilityAdmin, Doctor, Nurse, Pharmacist
- `x-facility-id`: optional facility id

Missing or malformed headers yield 401; role denials yield 403.

## Error Handling

```json
{
  "error": "Unprocessable Entity",
  "message": "Insufficient stock: Insufficient stock for Amoxicillin 500mg. Current stock: 10",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&PrincipalHeaders),
    tags(
        (name = "inventory", description = "Stock items, adjustments and reorder suggestions"),
        (name = "orders", description = "Supplier orders"),
        (name = "dispensing", description = "Prescription dispensing"),
        (name = "reports", description = "Inventory and billing reports"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::inventory::reorder_suggestions,
        crate::handlers::inventory::register_item,
        crate::handlers::inventory::get_item,
        crate::handlers::inventory::update_item,
        crate::handlers::inventory::remove_item,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::stock_history,

        crate::handlers::orders::place_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::receive_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::order_history,

        crate::handlers::dispensing::dispense,

        crate::handlers::reports::stock_levels,
        crate::handlers::reports::medication_usage,
        crate::handlers::reports::expiring_medications,
        crate::handlers::reports::insurance_dispensing,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::entities::StockUnit,
            crate::entities::TransactionType,
            crate::entities::OrderStatus,
            crate::entities::PrescriptionStatus,
            crate::entities::PaymentMethod,
            crate::auth::Role,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        for path in [
            "/api/v1/dispense",
            "/api/v1/orders/{id}/receive",
            "/api/v1/inventory/reorder-suggestions",
            "/api/v1/reports/insurance-dispensing",
            "/health",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
        assert!(json.contains("x-actor-role"));
    }
}
