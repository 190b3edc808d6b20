use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use garment_backoffice::{
    build_router,
    config::AppConfig,
    services::audit_queue::{AuditQueue, AuditQueueConfig, StoreAuditSink},
    store::{collections, DocumentStore, MemoryStore},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

/// Helper harness for spinning up the full router over an in-memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    _audit_worker: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.store_backend = "memory".to_string();

        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn DocumentStore> = store.clone();
        let (audit, audit_worker) = AuditQueue::spawn(
            Arc::new(StoreAuditSink::new(dyn_store.clone())),
            AuditQueueConfig {
                debounce: Duration::ZERO,
                capacity: 256,
                session_id: "test-session".to_string(),
            },
        );

        let state = AppState::new(cfg, dyn_store, audit);
        let router = build_router(state.clone(), CorsLayer::permissive());

        Self {
            router,
            state,
            store,
            _audit_worker: audit_worker,
        }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON body, asserting the status.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        expected: StatusCode,
    ) -> Value {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let value = response_json(response).await;
        assert_eq!(status, expected, "unexpected status for {}: {}", uri, value);
        value
    }

    pub async fn create_material(&self, name: &str, price: &str, gst_rate: &str) -> Value {
        self.json(
            Method::POST,
            "/api/v1/materials",
            Some(json!({
                "name": name,
                "code": name.to_uppercase(),
                "size": "L",
                "color": "Navy",
                "unit": "mtr",
                "price": price,
                "gstRate": gst_rate,
            })),
            StatusCode::CREATED,
        )
        .await
    }

    pub async fn create_vendor(&self, name: &str) -> Value {
        self.json(
            Method::POST,
            "/api/v1/partners",
            Some(json!({
                "type": "Vendor",
                "name": name,
                "phone": "9876543210",
                "email": "sales@example.com",
            })),
            StatusCode::CREATED,
        )
        .await
    }

    /// Waits for the audit worker and returns what reached the `logs` collection.
    pub async fn audit_log(&self) -> Vec<Value> {
        self.state
            .audit
            .flush()
            .await
            .expect("audit worker should be running");
        self.store
            .list(collections::AUDIT_LOGS)
            .await
            .expect("memory store is online")
            .into_iter()
            .map(|(_, doc)| doc)
            .collect()
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
