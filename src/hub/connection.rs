use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ConnectionError, DeliveryError};

/// Authenticated user identity. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ConnectionError> {
        let trimmed = raw.as_ref().trim();

        if trimmed.is_empty() {
            return Err(ConnectionError::InvalidUserId);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ConnectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of one live push channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-side delivery of one serialized frame to one connection.
#[async_trait]
pub trait PushSink: Send + Sync {
    async fn push(&self, frame: Arc<String>) -> Result<(), DeliveryError>;
}

/// Posts frames into the bounded channel drained by a connection's writer task.
pub struct ChannelSink {
    tx: mpsc::Sender<Arc<String>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Arc<String>>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl PushSink for ChannelSink {
    async fn push(&self, frame: Arc<String>) -> Result<(), DeliveryError> {
        self.tx.send(frame).await.map_err(|_| DeliveryError::Closed)
    }
}

#[derive(Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sink: Arc<dyn PushSink>,
    close_signal: CancellationToken,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sink: Arc<dyn PushSink>) -> Self {
        Self {
            id,
            sink,
            close_signal: CancellationToken::new(),
        }
    }

    /// Asks the transport owning this connection to end it.
    pub fn request_close(&self) {
        self.close_signal.cancel();
    }

    pub fn close_requested(&self) -> bool {
        self.close_signal.is_cancelled()
    }

    /// Resolves once [`ConnectionHandle::request_close`] has been called on any clone.
    pub fn close_signal(&self) -> CancellationToken {
        self.close_signal.clone()
    }
}

impl Debug for ConnectionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub user_id: UserId,
    pub handle: ConnectionHandle,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    pub fn new(user_id: UserId, handle: ConnectionHandle) -> Self {
        Self {
            user_id,
            handle,
            connected_at: Utc::now(),
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.handle.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Transport-side lifecycle of a single push channel.
///
/// `Connecting -> Connected -> Disconnected`. Only an authenticated
/// connection reaches `Connected`, and `Disconnected` is terminal.
#[derive(Debug)]
pub struct Connection {
    handle: ConnectionHandle,
    state: ConnectionState,
    user_id: Option<UserId>,
}

impl Connection {
    pub fn open(sink: Arc<dyn PushSink>) -> Self {
        Self::with_id(ConnectionId::generate(), sink)
    }

    pub fn with_id(id: ConnectionId, sink: Arc<dyn PushSink>) -> Self {
        Self {
            handle: ConnectionHandle::new(id, sink),
            state: ConnectionState::Connecting,
            user_id: None,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.handle.id
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Binds the resolved identity. An anonymous handshake ends the connection.
    pub fn authenticate(&mut self, user_id: Option<UserId>) -> Result<&UserId, ConnectionError> {
        match self.state {
            ConnectionState::Connected => return Err(ConnectionError::AlreadyAuthenticated),
            ConnectionState::Disconnected => return Err(ConnectionError::AlreadyClosed),
            ConnectionState::Connecting => {}
        }

        let Some(user_id) = user_id else {
            self.state = ConnectionState::Disconnected;
            debug!(connection_id = %self.handle.id, "Anonymous connection refused");
            return Err(ConnectionError::Anonymous);
        };

        self.state = ConnectionState::Connected;
        Ok(&*self.user_id.insert(user_id))
    }

    /// Returns `true` only for the call that performed the transition.
    pub fn close(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }

        self.state = ConnectionState::Disconnected;
        true
    }
}
