use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Garment Back Office API",
        version = "1.0.0",
        description = r#"
Back-office API for a garment manufacturing unit.

- **Partners**: vendor and customer directory with GST and PAN details
- **Materials**: raw material catalog with price, GST rate and unit
- **Purchase orders**: received and given books; line totals and grand totals are always computed by the server
- **Production**: one record per day covering six stages, material usage and machine logs
- **Audit**: best-effort trail of API calls and client events

Errors share one body:

```json
{
  "error": "Bad Request",
  "message": "Validation failed: name: Name is required",
  "request_id": "7d0c...",
  "timestamp": "2024-03-01T09:30:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "partners", description = "Vendor and customer directory"),
        (name = "materials", description = "Raw material catalog"),
        (name = "purchase-orders", description = "Received and given purchase orders"),
        (name = "production", description = "Daily production log"),
        (name = "audit", description = "Audit trail"),
        (name = "health", description = "Liveness and build info")
    ),
    paths(
        crate::handlers::partners::list_partners,
        crate::handlers::partners::create_partner,
        crate::handlers::partners::get_partner,
        crate::handlers::partners::update_partner,
        crate::handlers::partners::delete_partner,

        crate::handlers::materials::list_materials,
        crate::handlers::materials::create_material,
        crate::handlers::materials::get_material,
        crate::handlers::materials::update_material,
        crate::handlers::materials::delete_material,

        crate::handlers::purchase_orders::apply_draft_edit,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::delete_purchase_order,

        crate::handlers::production::get_production_day,
        crate::handlers::production::save_production_group,
        crate::handlers::production::get_production_month,

        crate::handlers::audit::record_event,

        crate::health_check,
        crate::api_status,
    ),
    components(
        schemas(
            crate::models::Partner,
            crate::models::PartnerInput,
            crate::models::PartnerType,
            crate::models::Address,
            crate::models::Material,
            crate::models::MaterialInput,
            crate::models::PurchaseOrder,
            crate::models::PurchaseOrderInput,
            crate::models::OrderLine,
            crate::models::OrderKind,
            crate::models::PurchaseOrderStatus,
            crate::models::PaymentStatus,
            crate::services::pricing::LineField,
            crate::services::purchase_orders::DraftEdit,
            crate::services::purchase_orders::DraftRequest,
            crate::services::purchase_orders::DraftResponse,
            crate::models::DayRecord,
            crate::models::Stage,
            crate::models::StageEntry,
            crate::models::MaterialRow,
            crate::models::MachineRow,
            crate::models::AuditEventInput,
            crate::models::AuditEventType,
            crate::handlers::audit::AuditAccepted,
            crate::StatusResponse,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the OpenAPI document as JSON
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDocV1::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_vertical() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        for path in [
            "/api/v1/partners/{id}",
            "/api/v1/materials",
            "/api/v1/purchase-orders/{kind}/{id}",
            "/api/v1/purchase-orders/draft",
            "/api/v1/production/month/{year}/{month}",
            "/api/v1/audit",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
        assert!(json.contains("ErrorResponse"));
    }
}
