use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use http::HeaderValue;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use garment_backoffice as app;
use app::services::audit_queue::{AuditQueue, AuditQueueConfig, StoreAuditSink};
use app::store::{DocumentStore, MemoryStore, SqlStore};

const AUDIT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);

    let store: Arc<dyn DocumentStore> = if cfg.uses_memory_store() {
        warn!("Using the in-memory document store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let db = app::db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?;
        app::db::ensure_schema(&db)
            .await
            .context("failed to prepare the documents table")?;
        Arc::new(SqlStore::new(Arc::new(db)))
    };

    let (audit, audit_worker) = AuditQueue::spawn(
        Arc::new(StoreAuditSink::new(store.clone())),
        AuditQueueConfig::from(&cfg),
    );

    let cors_layer = cors_layer(&cfg.cors_origins(), cfg.is_production());
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let state = app::AppState::new(cfg, store, audit.clone());
    let router = app::build_router(state, cors_layer);

    info!("garment-backoffice listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Flushing pending audit events");
    match tokio::time::timeout(AUDIT_FLUSH_TIMEOUT, audit.flush()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "audit flush failed"),
        Err(_) => warn!("audit flush timed out"),
    }
    drop(audit);
    if let Err(err) = audit_worker.await {
        warn!(error = %err, "audit worker ended abnormally");
    }

    Ok(())
}

fn cors_layer(origins: &[String], production: bool) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !allowed.is_empty() {
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        if production {
            warn!("No CORS origins configured in production; allowing any origin");
        }
        CorsLayer::permissive()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
