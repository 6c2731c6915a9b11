use std::time::Duration;

use thiserror::Error;

use crate::models::request::RequestKind;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("No handler registered for request '{0}'")]
    NoHandlerRegistered(RequestKind),

    #[error("A handler is already registered for request '{0}'")]
    DuplicateHandler(RequestKind),

    #[error("Handler for request '{kind}' failed: {reason}")]
    HandlerFault { kind: RequestKind, reason: String },

    #[error("Handler for request '{kind}' timed out after {timeout:?}")]
    HandlerTimeout { kind: RequestKind, timeout: Duration },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection channel is closed")]
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectionError {
    #[error("Connection has no authenticated user identity")]
    Anonymous,

    #[error("User id cannot be empty")]
    InvalidUserId,

    #[error("Connection is already authenticated")]
    AlreadyAuthenticated,

    #[error("Connection is already closed")]
    AlreadyClosed,
}
