use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon_url: String,
    pub trigger_type: String,
    pub target_action: String,
    pub required_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub user_id: String,

    #[serde(rename = "type")]
    pub notification_type: String,

    pub message: String,

    #[serde(default)]
    pub is_read: bool,
}

impl NotificationResponse {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            notification_type: notification_type.into(),
            message: message.into(),
            is_read: false,
        }
    }

    /// Copy of this notification flagged as read, for read-receipt flows.
    pub fn mark_read(&self) -> Self {
        Self {
            is_read: true,
            ..self.clone()
        }
    }
}

/// Typed payload pushed to a user's live connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NotificationPayload {
    Badge(BadgeResponse),
    Notification(NotificationResponse),
}

impl NotificationPayload {
    pub fn event_name(&self) -> &'static str {
        match self {
            NotificationPayload::Badge(_) => "badge",
            NotificationPayload::Notification(_) => "notification",
        }
    }
}

impl From<BadgeResponse> for NotificationPayload {
    fn from(badge: BadgeResponse) -> Self {
        NotificationPayload::Badge(badge)
    }
}

impl From<NotificationResponse> for NotificationPayload {
    fn from(notification: NotificationResponse) -> Self {
        NotificationPayload::Notification(notification)
    }
}

/// Frame written to a connection. Serialized once per fan-out and shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    pub event_id: Uuid,
    pub event: String,
    pub payload: NotificationPayload,
    pub sent_at: DateTime<Utc>,
}

impl PushEvent {
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event: payload.event_name().to_string(),
            payload,
            sent_at: Utc::now(),
        }
    }
}
