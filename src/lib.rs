//! Garment back office
//!
//! HTTP service over a document store for a garment manufacturing unit:
//! partner directory, raw material catalog, received and given purchase
//! orders, the daily production log and a best-effort audit trail.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::services::audit_queue::AuditQueue;
use crate::store::DocumentStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub services: handlers::AppServices,
    pub audit: AuditQueue,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, audit: AuditQueue) -> Self {
        let services = handlers::AppServices::new(store.clone(), &config);
        Self {
            config: Arc::new(config),
            store,
            services,
            audit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub environment: String,
    /// Present on the health endpoint only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    pub timestamp: String,
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/partners", handlers::partners::partner_routes())
        .nest("/materials", handlers::materials::material_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/production", handlers::production::production_routes())
        .nest("/audit", handlers::audit::audit_routes())
}

/// Full application router with the middleware stack applied.
///
/// Layers run outermost first: request id, HTTP tracing, CORS, audit.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(|| async { "garment-backoffice up" }))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", api_v1_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.audit.clone(),
            middleware_helpers::audit_middleware,
        ))
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

/// Service name and build version
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        store: None,
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Liveness plus a document store round trip
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Health report", body = StatusResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<StatusResponse> {
    let store_status = match state.store.get(store::collections::PARTNERS, "_health").await {
        Ok(_) => "healthy",
        Err(err) => {
            ::tracing::warn!(error = %err, "document store health probe failed");
            "unhealthy"
        }
    };

    Json(StatusResponse {
        status: if store_status == "healthy" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        store: Some(store_status.to_string()),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub mod prelude {
    pub use crate::config::{load_config, AppConfig};
    pub use crate::errors::*;
    pub use crate::models::*;
    pub use crate::store::{Collection, DocumentStore, MemoryStore, SqlStore};
    pub use crate::{build_router, AppState};
}
