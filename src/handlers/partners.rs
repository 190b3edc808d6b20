use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{PartnerInput, PartnerType},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPartnersQuery {
    /// Only partners of this type
    #[serde(rename = "type")]
    pub partner_type: Option<PartnerType>,
}

/// List partners ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/partners",
    params(ListPartnersQuery),
    responses(
        (status = 200, description = "Partners", body = [crate::models::Partner]),
        (status = 503, description = "Store unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "partners"
)]
pub async fn list_partners(
    State(state): State<AppState>,
    Query(query): Query<ListPartnersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let partners = state
        .services
        .partners
        .list_partners(query.partner_type)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(partners))
}

/// Create a vendor or customer
#[utoipa::path(
    post,
    path = "/api/v1/partners",
    request_body = PartnerInput,
    responses(
        (status = 201, description = "Partner created", body = crate::models::Partner),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "partners"
)]
pub async fn create_partner(
    State(state): State<AppState>,
    Json(payload): Json<PartnerInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.normalized();
    validate_input(&payload)?;

    let partner = state
        .services
        .partners
        .create_partner(payload)
        .await
        .map_err(map_service_error)?;
    info!("Partner created: {}", partner.id);
    Ok(created_response(partner))
}

/// Get a partner by ID
#[utoipa::path(
    get,
    path = "/api/v1/partners/{id}",
    params(("id" = String, Path, description = "Partner ID")),
    responses(
        (status = 200, description = "Partner", body = crate::models::Partner),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    tag = "partners"
)]
pub async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let partner = state
        .services
        .partners
        .get_partner(&id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Partner with ID {} not found", id)))?;
    Ok(success_response(partner))
}

/// Replace a partner
#[utoipa::path(
    put,
    path = "/api/v1/partners/{id}",
    params(("id" = String, Path, description = "Partner ID")),
    request_body = PartnerInput,
    responses(
        (status = 200, description = "Partner updated", body = crate::models::Partner),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    tag = "partners"
)]
pub async fn update_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PartnerInput>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.normalized();
    validate_input(&payload)?;

    let partner = state
        .services
        .partners
        .update_partner(&id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(partner))
}

/// Delete a partner
#[utoipa::path(
    delete,
    path = "/api/v1/partners/{id}",
    params(("id" = String, Path, description = "Partner ID")),
    responses(
        (status = 204, description = "Partner deleted"),
        (status = 404, description = "Partner not found", body = crate::errors::ErrorResponse)
    ),
    tag = "partners"
)]
pub async fn delete_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .partners
        .delete_partner(&id)
        .await
        .map_err(map_service_error)?;
    info!("Partner deleted: {}", id);
    Ok(no_content_response())
}

pub fn partner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_partners).post(create_partner))
        .route(
            "/:id",
            get(get_partner).put(update_partner).delete(delete_partner),
        )
}
