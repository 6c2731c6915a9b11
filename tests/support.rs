use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use notification_hub::{
    api::{AppState, HeaderIdentityResolver},
    bus::RequestBus,
    error::DeliveryError,
    handlers::register_builtin_handlers,
    hub::{
        connection::{ConnectionHandle, ConnectionId, PushSink, UserId},
        dispatcher::NotificationDispatcher,
        registry::ConnectionRegistry,
    },
    models::payload::{BadgeResponse, NotificationPayload, NotificationResponse, PushEvent},
};
use parking_lot::Mutex;
use tokio::time::Duration;

#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn events(&self) -> Vec<PushEvent> {
        self.frames()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("frame is a push event"))
            .collect()
    }
}

#[async_trait]
impl PushSink for RecordingSink {
    async fn push(&self, frame: Arc<String>) -> Result<(), DeliveryError> {
        self.frames.lock().push(frame.as_str().to_string());
        Ok(())
    }
}

/// Behaves like a socket that closed mid-send.
#[derive(Default)]
pub struct ClosedSink {
    attempts: AtomicUsize,
}

impl ClosedSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSink for ClosedSink {
    async fn push(&self, _frame: Arc<String>) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DeliveryError::Closed)
    }
}

/// Never completes a send.
pub struct StalledSink;

#[async_trait]
impl PushSink for StalledSink {
    async fn push(&self, _frame: Arc<String>) -> Result<(), DeliveryError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

pub fn user(id: &str) -> UserId {
    UserId::parse(id).expect("valid user id")
}

pub fn handle(id: &str, sink: Arc<dyn PushSink>) -> ConnectionHandle {
    ConnectionHandle::new(ConnectionId::from(id), sink)
}

pub fn recording_handle(id: &str) -> (ConnectionHandle, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (handle(id, sink.clone()), sink)
}

pub fn first_login_notification(user_id: &str) -> NotificationPayload {
    NotificationResponse::new(user_id, "Badge", "First Login").into()
}

pub fn first_login_badge() -> NotificationPayload {
    BadgeResponse {
        id: "badge-first-login".to_string(),
        name: "First Login".to_string(),
        description: "Signed in for the first time".to_string(),
        icon_url: "https://cdn.example.com/badges/first-login.png".to_string(),
        trigger_type: "login".to_string(),
        target_action: "login".to_string(),
        required_count: 1,
        created_at: Utc::now(),
    }
    .into()
}

pub struct TestHub {
    pub state: Arc<AppState>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl TestHub {
    /// Same registry and identity resolution, different request bus.
    pub fn state_with_bus(&self, bus: RequestBus) -> Arc<AppState> {
        Arc::new(AppState {
            bus: Arc::new(bus),
            registry: Arc::clone(&self.registry),
            identity: Arc::clone(&self.state.identity),
            connection_buffer_size: self.state.connection_buffer_size,
            max_page_size: self.state.max_page_size,
        })
    }
}

pub fn test_hub() -> TestHub {
    let registry = Arc::new(ConnectionRegistry::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::clone(&registry),
        Duration::from_millis(200),
    ));

    let mut builder = RequestBus::builder();
    register_builtin_handlers(&mut builder, Arc::clone(&dispatcher))
        .expect("builtin handlers register");

    let state = Arc::new(AppState {
        bus: Arc::new(builder.build()),
        registry: Arc::clone(&registry),
        identity: Arc::new(HeaderIdentityResolver::new("x-user-id").expect("valid header")),
        connection_buffer_size: 8,
        max_page_size: 50,
    });

    TestHub {
        state,
        registry,
        dispatcher,
    }
}
