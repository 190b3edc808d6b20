use super::common::{
    created_response, map_service_error, no_content_response, parse_segment, success_response,
    validate_input,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{OrderKind, PurchaseOrderInput, PurchaseOrderStatus},
    services::purchase_orders::DraftRequest,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    /// Only orders in this status
    pub status: Option<PurchaseOrderStatus>,
}

fn order_kind(raw: &str) -> Result<OrderKind, ApiError> {
    parse_segment(raw, "order book")
}

/// Apply one pricing edit to an unsaved order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/draft",
    request_body = DraftRequest,
    responses(
        (status = 200, description = "Draft after the edit", body = crate::services::purchase_orders::DraftResponse),
        (status = 400, description = "Line index out of range or amount too large", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn apply_draft_edit(
    State(state): State<AppState>,
    Json(payload): Json<DraftRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = state
        .services
        .purchase_orders
        .apply_draft(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(draft))
}

/// List one order book, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{kind}",
    params(
        ("kind" = OrderKind, Path, description = "`received` or `given`"),
        ListOrdersQuery
    ),
    responses(
        (status = 200, description = "Orders", body = [crate::models::PurchaseOrder]),
        (status = 404, description = "Unknown order book", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = order_kind(&kind)?;
    let orders = state
        .services
        .purchase_orders
        .list_orders(kind, query.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

/// Create a purchase order; totals are computed server side
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{kind}",
    params(("kind" = OrderKind, Path, description = "`received` or `given`")),
    request_body = PurchaseOrderInput,
    responses(
        (status = 201, description = "Purchase order created", body = crate::models::PurchaseOrder),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order number already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(payload): Json<PurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = order_kind(&kind)?;
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .create_order(kind, payload)
        .await
        .map_err(map_service_error)?;
    info!("Purchase order created: {} ({})", order.po_no, order.id);
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{kind}/{id}",
    params(
        ("kind" = OrderKind, Path, description = "`received` or `given`"),
        ("id" = String, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order", body = crate::models::PurchaseOrder),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = order_kind(&kind)?;
    let order = state
        .services
        .purchase_orders
        .get_order(kind, &id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Purchase order with ID {} not found", id)))?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{kind}/{id}",
    params(
        ("kind" = OrderKind, Path, description = "`received` or `given`"),
        ("id" = String, Path, description = "Purchase order ID")
    ),
    request_body = PurchaseOrderInput,
    responses(
        (status = 200, description = "Purchase order updated", body = crate::models::PurchaseOrder),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order number already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(payload): Json<PurchaseOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = order_kind(&kind)?;
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .update_order(kind, &id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{kind}/{id}",
    params(
        ("kind" = OrderKind, Path, description = "`received` or `given`"),
        ("id" = String, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = order_kind(&kind)?;
    state
        .services
        .purchase_orders
        .delete_order(kind, &id)
        .await
        .map_err(map_service_error)?;
    info!("Purchase order deleted: {}", id);
    Ok(no_content_response())
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/draft", post(apply_draft_edit))
        .route(
            "/:kind",
            get(list_purchase_orders).post(create_purchase_order),
        )
        .route(
            "/:kind/:id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
}
