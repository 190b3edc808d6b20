use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{errors::ApiError, handlers::AppState, models::MaterialInput};
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
pub struct ListMaterialsQuery {
    /// Case-insensitive match on name or code
    pub search: Option<String>,
}

/// List the material catalog
#[utoipa::path(
    get,
    path = "/api/v1/materials",
    params(ListMaterialsQuery),
    responses(
        (status = 200, description = "Materials", body = [crate::models::Material])
    ),
    tag = "materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<ListMaterialsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let materials = state
        .services
        .materials
        .list_materials(query.search.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(materials))
}

/// Add a material to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/materials",
    request_body = MaterialInput,
    responses(
        (status = 201, description = "Material created", body = crate::models::Material),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    Json(payload): Json<MaterialInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let material = state
        .services
        .materials
        .create_material(payload)
        .await
        .map_err(map_service_error)?;
    info!("Material created: {}", material.id);
    Ok(created_response(material))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    params(("id" = String, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material", body = crate::models::Material),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let material = state
        .services
        .materials
        .get_material(&id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Material with ID {} not found", id)))?;
    Ok(success_response(material))
}

#[utoipa::path(
    put,
    path = "/api/v1/materials/{id}",
    params(("id" = String, Path, description = "Material ID")),
    request_body = MaterialInput,
    responses(
        (status = 200, description = "Material updated", body = crate::models::Material),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<MaterialInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let material = state
        .services
        .materials
        .update_material(&id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(material))
}

#[utoipa::path(
    delete,
    path = "/api/v1/materials/{id}",
    params(("id" = String, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .materials
        .delete_material(&id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route(
            "/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}
