use super::common::{map_service_error, parse_date, parse_segment, success_response};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{DayGroup, DayPatch},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde_json::Value;

/// Production day, blank when nothing was recorded
#[utoipa::path(
    get,
    path = "/api/v1/production/{date}",
    params(("date" = String, Path, description = "Day as YYYY-MM-DD")),
    responses(
        (status = 200, description = "Day record", body = crate::models::DayRecord),
        (status = 400, description = "Invalid date", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn get_production_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date(&date)?;
    let record = state
        .services
        .production
        .get_day(date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

/// Save one field group (`production`, `materials` or `machines`) of a day
#[utoipa::path(
    put,
    path = "/api/v1/production/{date}/{group}",
    params(
        ("date" = String, Path, description = "Day as YYYY-MM-DD"),
        ("group" = String, Path, description = "`production`, `materials` or `machines`")
    ),
    request_body(content = serde_json::Value, description = "Stage map for `production`, row list otherwise"),
    responses(
        (status = 200, description = "Merged day record", body = crate::models::DayRecord),
        (status = 400, description = "Invalid body", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown group", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn save_production_group(
    State(state): State<AppState>,
    Path((date, group)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date(&date)?;
    let group: DayGroup = parse_segment(&group, "production group")?;
    let patch = DayPatch::from_group(group, body).map_err(|e| ApiError::BadRequest {
        message: format!("Invalid {} data", group),
        details: Some(e.to_string()),
    })?;

    let record = state
        .services
        .production
        .save_group(date, patch)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

/// Every day of a month, for the calendar grid
#[utoipa::path(
    get,
    path = "/api/v1/production/month/{year}/{month}",
    params(
        ("year" = i32, Path, description = "Year"),
        ("month" = u32, Path, description = "Month, 1-12")
    ),
    responses(
        (status = 200, description = "One record per day", body = [crate::models::DayRecord]),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse)
    ),
    tag = "production"
)]
pub async fn get_production_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ApiError> {
    let days = state
        .services
        .production
        .month(year, month)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(days))
}

pub fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/month/:year/:month", get(get_production_month))
        .route("/:date", get(get_production_day))
        .route("/:date/:group", put(save_production_group))
}
