//! Bounded hand-off between webhook receipt and reconciliation.
//!
//! The HTTP handler enqueues a verified event and acknowledges at once.
//! A single worker drains the channel.

use crate::error::QueueError;
use crate::event::SubscriptionEvent;
use crate::reconciler::Reconciler;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Producer side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<SubscriptionEvent>,
}

impl QueueHandle {
    /// Enqueues without waiting.
    ///
    /// `Full` means the caller should make the provider redeliver later.
    pub fn try_enqueue(&self, event: SubscriptionEvent) -> Result<(), QueueError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

/// Owns the worker task.
pub struct WebhookQueue {
    handle: QueueHandle,
    worker: JoinHandle<()>,
}

impl WebhookQueue {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(reconciler: Arc<Reconciler>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<SubscriptionEvent>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                debug!(event_id = %event.event_id, "reconciling queued event");
                match reconciler.reconcile(&event).await {
                    Ok(_) => {}
                    Err(e) if e.is_transient() => warn!(
                        event_id = %event.event_id,
                        subscription_id = %event.subscription_id,
                        "dropping acknowledged event; replay it from the provider dashboard: {e}"
                    ),
                    Err(e) => error!(
                        event_id = %event.event_id,
                        subscription_id = %event.subscription_id,
                        "dropping event: {e}"
                    ),
                }
            }
            info!("webhook queue drained");
        });

        Self {
            handle: QueueHandle { tx },
            worker,
        }
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Closes the queue, processes what is left, and waits for the worker.
    ///
    /// Outstanding [`QueueHandle`] clones keep the channel open; drop them
    /// first.
    pub async fn shutdown(self) {
        drop(self.handle);
        if let Err(e) = self.worker.await {
            error!("webhook worker panicked: {e}");
        }
    }
}
