use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

use crate::hub::{connection::ConnectionId, registry::ConnectionRegistry};

/// Disconnects every connection reported as stale by the dispatcher. Removal
/// signals the owning transport to close its socket.
pub fn spawn_reaper(
    registry: Arc<ConnectionRegistry>,
    mut stale_rx: mpsc::UnboundedReceiver<ConnectionId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(connection_id) = stale_rx.recv().await {
            match registry.on_disconnect(&connection_id) {
                Some(entry) => info!(
                    user_id = %entry.user_id,
                    connection_id = %connection_id,
                    "Stale connection reaped"
                ),
                None => debug!(connection_id = %connection_id, "Stale connection already gone"),
            }
        }

        debug!("Stale connection channel closed, reaper stopping");
    })
}
