use std::sync::Arc;

use anyhow::Error;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::{
    bus::{RequestBusBuilder, RequestHandler},
    error::BusError,
    hub::{connection::UserId, dispatcher::NotificationDispatcher},
    models::{request::PushNotificationRequest, response::ResponseEnvelope},
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationResult {
    pub delivery_count: usize,
}

/// Pushes a caller-supplied payload to the target user's live connections.
pub struct PushNotificationHandler {
    dispatcher: Arc<NotificationDispatcher>,
}

impl PushNotificationHandler {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl RequestHandler<PushNotificationRequest> for PushNotificationHandler {
    async fn handle(&self, request: PushNotificationRequest) -> Result<ResponseEnvelope, Error> {
        let user_id = match UserId::parse(&request.user_id) {
            Ok(user_id) => user_id,
            Err(e) => return Ok(ResponseEnvelope::failure(format!("Invalid userId: {}", e))),
        };

        let delivery_count = self.dispatcher.notify(&user_id, request.payload).await;
        debug!(user_id = %user_id, delivery_count, "Push notification handled");

        Ok(ResponseEnvelope::ok(
            PushNotificationResult { delivery_count },
            "Notification dispatched",
        ))
    }
}

pub fn register_builtin_handlers(
    builder: &mut RequestBusBuilder,
    dispatcher: Arc<NotificationDispatcher>,
) -> Result<(), BusError> {
    builder.register::<PushNotificationRequest, _>(PushNotificationHandler::new(dispatcher))?;
    Ok(())
}
