use super::common::validate_input;
use crate::{
    errors::ApiError, handlers::AppState, middleware_helpers::audit::session_id,
    models::AuditEventInput,
};
use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditAccepted {
    /// `false` when the event was dropped because the queue was full
    pub accepted: bool,
}

/// Record a client-side event (sign-in, sign-out, custom actions)
#[utoipa::path(
    post,
    path = "/api/v1/audit",
    request_body = AuditEventInput,
    params(("x-session-id" = Option<String>, Header, description = "Browser session")),
    responses(
        (status = 202, description = "Event queued", body = AuditAccepted),
        (status = 400, description = "Invalid event", body = crate::errors::ErrorResponse)
    ),
    tag = "audit"
)]
pub async fn record_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AuditEventInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = session_id(&headers).unwrap_or_else(|| state.audit.session_id().to_string());
    let accepted = state.audit.enqueue(payload.into_event(session));
    Ok((StatusCode::ACCEPTED, Json(AuditAccepted { accepted })))
}

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/", post(record_event))
}
