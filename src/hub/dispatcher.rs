use std::sync::Arc;

use futures_util::future::join_all;
use tokio::{
    sync::mpsc,
    time::{Duration, timeout},
};
use tracing::{debug, error, info, warn};

use crate::{
    error::DeliveryError,
    hub::{
        connection::{ConnectionEntry, ConnectionId, UserId},
        registry::ConnectionRegistry,
    },
    models::payload::{NotificationPayload, PushEvent},
};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<(ConnectionId, DeliveryError)>,
}

/// Fans a notification out to every live connection of its target user.
///
/// Only reads registry snapshots. Connections that fail or time out are
/// reported on the stale-connection channel for the reaper to reconcile.
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    delivery_timeout: Duration,
    stale_tx: Option<mpsc::UnboundedSender<ConnectionId>>,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            delivery_timeout,
            stale_tx: None,
        }
    }

    pub fn with_stale_reporter(mut self, stale_tx: mpsc::UnboundedSender<ConnectionId>) -> Self {
        self.stale_tx = Some(stale_tx);
        self
    }

    /// Returns how many connections a delivery was attempted on.
    pub async fn notify(&self, user_id: &UserId, payload: NotificationPayload) -> usize {
        self.notify_with_report(user_id, payload).await.attempted
    }

    pub async fn notify_with_report(
        &self,
        user_id: &UserId,
        payload: NotificationPayload,
    ) -> DeliveryReport {
        let connections = self.registry.connections_for(user_id);

        if connections.is_empty() {
            debug!(user_id = %user_id, "User has no live connections, notification dropped");
            return DeliveryReport::default();
        }

        let event = PushEvent::new(payload);
        let frame = match serde_json::to_string(&event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                error!(user_id = %user_id, event = %event.event, error = %e, "Failed to serialize push event");
                return DeliveryReport::default();
            }
        };

        let attempts = connections
            .iter()
            .map(|entry| self.deliver(entry, Arc::clone(&frame)));
        let results = join_all(attempts).await;

        let mut report = DeliveryReport {
            attempted: results.len(),
            ..DeliveryReport::default()
        };

        for (connection_id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        connection_id = %connection_id,
                        error = %e,
                        "Push delivery failed"
                    );
                    self.report_stale(&connection_id);
                    report.failed.push((connection_id, e));
                }
            }
        }

        info!(
            user_id = %user_id,
            event_id = %event.event_id,
            event = %event.event,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Notification fanned out"
        );

        report
    }

    async fn deliver(
        &self,
        entry: &ConnectionEntry,
        frame: Arc<String>,
    ) -> (ConnectionId, Result<(), DeliveryError>) {
        let result = match timeout(self.delivery_timeout, entry.handle.sink.push(frame)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout)),
        };

        (entry.connection_id().clone(), result)
    }

    fn report_stale(&self, connection_id: &ConnectionId) {
        let Some(stale_tx) = &self.stale_tx else {
            return;
        };

        if stale_tx.send(connection_id.clone()).is_err() {
            debug!(connection_id = %connection_id, "Reaper is gone, stale connection not reported");
        }
    }
}
