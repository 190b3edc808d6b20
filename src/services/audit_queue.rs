//! Best-effort audit trail writer.
//!
//! Callers hand events to [`AuditQueue::enqueue`] without waiting. A single
//! worker task owns the receiving end of a bounded channel: after the first
//! event of a burst it waits for the debounce window, drains whatever has
//! queued up, and persists the events one at a time in emission order.
//! Sink failures are logged and the event is dropped.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::models::AuditEvent;
use crate::store::{collections, DocumentStore};

/// Destination of drained audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn persist(&self, event: &AuditEvent) -> Result<(), ServiceError>;
}

/// Writes each event as its own document in the `logs` collection.
pub struct StoreAuditSink {
    store: Arc<dyn DocumentStore>,
}

impl StoreAuditSink {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditSink for StoreAuditSink {
    async fn persist(&self, event: &AuditEvent) -> Result<(), ServiceError> {
        let document = serde_json::to_value(event)?;
        self.store.add(collections::AUDIT_LOGS, document).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuditQueueConfig {
    pub debounce: Duration,
    pub capacity: usize,
    /// Session stamped on events that arrive without one
    pub session_id: String,
}

impl Default for AuditQueueConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            capacity: 1024,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl From<&AppConfig> for AuditQueueConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            debounce: cfg.audit_debounce(),
            capacity: cfg.audit_queue_capacity,
            ..Default::default()
        }
    }
}

enum Command {
    Record(AuditEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit worker. Cheap to clone.
#[derive(Clone)]
pub struct AuditQueue {
    tx: mpsc::Sender<Command>,
    session_id: Arc<str>,
}

impl AuditQueue {
    /// Starts the worker on the current runtime.
    ///
    /// The worker stops once every handle is dropped and the channel is empty.
    pub fn spawn(sink: Arc<dyn AuditSink>, config: AuditQueueConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        info!(
            capacity = config.capacity,
            debounce_ms = config.debounce.as_millis() as u64,
            "starting audit worker"
        );
        let handle = tokio::spawn(run_worker(rx, sink, config.debounce));
        let queue = Self {
            tx,
            session_id: Arc::from(config.session_id),
        };
        (queue, handle)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queues an event without waiting. Returns `false` when the event was
    /// dropped because the queue is full or the worker has stopped.
    pub fn enqueue(&self, mut event: AuditEvent) -> bool {
        if event.session_id.is_empty() {
            event.session_id = self.session_id.to_string();
        }
        match self.tx.try_send(Command::Record(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(Command::Record(event))) => {
                warn!(action = %event.action, "audit queue full; event dropped");
                false
            }
            Err(_) => {
                warn!("audit worker stopped; event dropped");
                false
            }
        }
    }

    /// Waits until every event queued before this call has been handled.
    ///
    /// Flushes from any number of callers go through the same channel as the
    /// events, so no event is ever processed twice.
    pub async fn flush(&self) -> Result<(), ServiceError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack_tx))
            .await
            .map_err(|_| ServiceError::QueueError("audit worker stopped".into()))?;
        ack_rx
            .await
            .map_err(|_| ServiceError::QueueError("audit worker dropped flush".into()))
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Command>,
    sink: Arc<dyn AuditSink>,
    debounce: Duration,
) {
    let mut batch = Vec::new();
    let mut acks = Vec::new();

    while let Some(first) = rx.recv().await {
        match first {
            Command::Record(event) => {
                batch.push(event);
                if !debounce.is_zero() {
                    sleep(debounce).await;
                }
            }
            Command::Flush(ack) => acks.push(ack),
        }

        while let Ok(command) = rx.try_recv() {
            match command {
                Command::Record(event) => batch.push(event),
                Command::Flush(ack) => acks.push(ack),
            }
        }

        let drained = batch.len();
        for event in batch.drain(..) {
            if let Err(err) = sink.persist(&event).await {
                warn!(
                    event_type = %event.event_type,
                    action = %event.action,
                    error = %err,
                    "failed to persist audit event"
                );
            }
        }
        if drained > 0 {
            debug!(events = drained, "audit batch drained");
        }

        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
    }

    info!("audit worker stopped");
}
