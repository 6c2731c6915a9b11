use std::sync::Arc;

use anyhow::{Error, Result};
use notification_hub::{
    api::{AppState, HeaderIdentityResolver, run_api_server},
    bus::RequestBus,
    config::Config,
    handlers::register_builtin_handlers,
    hub::{dispatcher::NotificationDispatcher, reaper::spawn_reaper, registry::ConnectionRegistry},
    utils::init_tracing,
};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    init_tracing(config.log_format);

    let registry = Arc::new(ConnectionRegistry::new());

    let (stale_tx, stale_rx) = mpsc::unbounded_channel();
    let reaper = spawn_reaper(Arc::clone(&registry), stale_rx);

    let dispatcher = Arc::new(
        NotificationDispatcher::new(Arc::clone(&registry), config.delivery_timeout())
            .with_stale_reporter(stale_tx),
    );

    let mut builder = RequestBus::builder().with_handler_timeout(config.handler_timeout());
    register_builtin_handlers(&mut builder, Arc::clone(&dispatcher))?;
    let bus = Arc::new(builder.build());

    let state = Arc::new(AppState {
        bus,
        registry,
        identity: Arc::new(HeaderIdentityResolver::new(&config.identity_header)?),
        connection_buffer_size: config.connection_buffer_size,
        max_page_size: config.max_page_size,
    });

    info!(port = config.server_port, "Configuration validated, starting notification hub");

    run_api_server(&config, state).await?;

    reaper.abort();
    info!("Notification hub stopped");

    Ok(())
}
