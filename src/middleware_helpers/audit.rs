//! Records API calls on the audit trail.
//!
//! Reads become `VIEW`, writes become `CREATE`/`UPDATE`/`DELETE`, and any
//! request answered with a 4xx or 5xx becomes `ERROR`. Events are handed to
//! the [`AuditQueue`] and never delay the response.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use std::time::Instant;
use tracing::debug;

use crate::models::{AuditEvent, AuditEventType};
use crate::services::audit_queue::AuditQueue;

/// Header carrying the browser session id
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Paths that are never audited
const SKIPPED_PREFIXES: &[&str] = &[
    "/health",
    "/api/v1/health",
    "/api/v1/status",
    "/api-docs",
    "/api/v1/audit",
    "/api/v1/purchase-orders/draft",
];

pub async fn audit_middleware(
    State(queue): State<AuditQueue>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if SKIPPED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().clone();
    let session_id = session_id(req.headers());
    let from = req
        .headers()
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let response = next.run(req).await;

    let status = response.status();
    let Some(event_type) = categorize_action(&method, status) else {
        return response;
    };
    let (resource, reference) = extract_resource_info(&path);

    let mut event = AuditEvent::new(event_type, format!("{} {}", method, path)).with_data(json!({
        "status": status.as_u16(),
        "durationMs": start.elapsed().as_millis() as u64,
        "resource": resource,
    }));
    if let Some(reference) = reference {
        event = event.with_ref(reference);
    }
    if let Some(from) = from {
        event = event.with_from(from);
    }
    if let Some(session_id) = session_id {
        event = event.with_session(session_id);
    }
    if event_type == AuditEventType::Error {
        event = event.with_message(
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        );
    }

    let queued = queue.enqueue(event);
    debug!(%method, %path, status = status.as_u16(), queued, "audit event recorded");
    response
}

pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn categorize_action(method: &Method, status: StatusCode) -> Option<AuditEventType> {
    if status.is_client_error() || status.is_server_error() {
        return Some(AuditEventType::Error);
    }
    match *method {
        Method::GET => Some(AuditEventType::View),
        Method::POST => Some(AuditEventType::Create),
        Method::PUT | Method::PATCH => Some(AuditEventType::Update),
        Method::DELETE => Some(AuditEventType::Delete),
        _ => None,
    }
}

/// Splits `/api/v1/<resource>/<rest..>` into the resource name and the
/// remaining segments, e.g. `purchase-orders` and `given/<id>`.
fn extract_resource_info(path: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if parts.len() >= 3 && parts[0] == "api" && parts[1].starts_with('v') {
        let reference = (parts.len() > 3).then(|| parts[3..].join("/"));
        (Some(parts[2].to_string()), reference)
    } else {
        (None, None)
    }
}
