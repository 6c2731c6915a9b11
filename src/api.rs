use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use axum::{
    Router,
    extract::{
        State,
        ws::{
            CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code,
            rejection::WebSocketUpgradeRejection,
        },
    },
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::mpsc};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::{
    bus::RequestBus,
    config::Config,
    error::BusError,
    hub::{
        connection::{ChannelSink, Connection, UserId},
        registry::{ConnectOutcome, ConnectionRegistry},
    },
    models::{health::HealthCheckResponse, request::Request, response::ResponseEnvelope},
    utils::shutdown_signal,
};

/// Resolves the authenticated user behind an incoming hub handshake.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserId>;
}

/// Trusts a header populated by an upstream authentication proxy.
pub struct HeaderIdentityResolver {
    header: HeaderName,
}

impl HeaderIdentityResolver {
    pub fn new(header: &str) -> Result<Self, Error> {
        let header = HeaderName::from_bytes(header.trim().to_lowercase().as_bytes())
            .map_err(|e| anyhow!("Invalid identity header '{}': {}", header, e))?;

        Ok(Self { header })
    }
}

impl IdentityResolver for HeaderIdentityResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<UserId> {
        let raw = headers.get(&self.header)?.to_str().ok()?;
        UserId::parse(raw).ok()
    }
}

pub struct AppState {
    pub bus: Arc<RequestBus>,
    pub registry: Arc<ConnectionRegistry>,
    pub identity: Arc<dyn IdentityResolver>,
    pub connection_buffer_size: usize,
    pub max_page_size: u32,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/dispatch", post(dispatch_request))
        .route("/hub", get(hub_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: &Config, state: Arc<AppState>) -> Result<(), Error> {
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = HealthCheckResponse::new(
        state.registry.connection_count(),
        state.registry.online_user_count(),
        state.bus.registered_kinds().len(),
    );

    (StatusCode::OK, Json(health))
}

async fn dispatch_request(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Request>,
) -> impl IntoResponse {
    let request = request.with_page_limit(state.max_page_size);
    let kind = request.kind();

    let (status_code, envelope) = match state.bus.try_dispatch(request).await {
        Ok(envelope) if envelope.success => (StatusCode::OK, envelope),
        Ok(envelope) => (StatusCode::BAD_REQUEST, envelope),
        Err(e) => {
            warn!(kind = %kind, error = %e, "Request dispatch failed");
            (bus_error_status(&e), ResponseEnvelope::failure(e.to_string()))
        }
    };

    (status_code, Json(envelope))
}

fn bus_error_status(error: &BusError) -> StatusCode {
    match error {
        BusError::NoHandlerRegistered(_) => StatusCode::NOT_IMPLEMENTED,
        BusError::HandlerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        BusError::HandlerFault { .. } | BusError::DuplicateHandler(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn hub_upgrade(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(user_id) = state.identity.resolve(&headers) else {
        warn!("Rejected hub connection without a resolved identity");
        let envelope = ResponseEnvelope::<Value>::failure("Authentication required");
        return (StatusCode::UNAUTHORIZED, Json(envelope)).into_response();
    };

    match upgrade {
        Ok(upgrade) => upgrade.on_upgrade(move |socket| run_connection(socket, user_id, state)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn run_connection(socket: WebSocket, user_id: UserId, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(state.connection_buffer_size);
    let mut connection = Connection::open(Arc::new(ChannelSink::new(tx)));

    if let Err(e) = connection.authenticate(Some(user_id.clone())) {
        warn!(user_id = %user_id, error = %e, "Hub connection could not be authenticated");
        return;
    }

    let connection_id = connection.id().clone();
    let close_signal = connection.handle().close_signal();

    if state.registry.on_connect(user_id.clone(), connection.handle().clone())
        == ConnectOutcome::OwnedByOtherUser
    {
        connection.close();
        return;
    }

    let (mut sender, mut receiver) = socket.split();

    let writer_connection_id = connection_id.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    if sender.send(Message::Text(frame.as_str().into())).await.is_err() {
                        break;
                    }
                }
                _ = close_signal.cancelled() => {
                    let frame = CloseFrame {
                        code: close_code::AWAY,
                        reason: Utf8Bytes::from_static("Connection removed from hub"),
                    };
                    if sender.send(Message::Close(Some(frame))).await.is_err() {
                        debug!(connection_id = %writer_connection_id, "Close frame not delivered");
                    }
                    break;
                }
            }
        }
    });

    let reader_connection_id = connection_id.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Close(_) => break,
                Message::Text(text) => debug!(
                    connection_id = %reader_connection_id,
                    bytes = text.as_str().len(),
                    "Ignoring inbound hub message"
                ),
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    state.registry.on_disconnect(&connection_id);
    connection.close();

    info!(user_id = %user_id, connection_id = %connection_id, "Hub connection closed");
}
