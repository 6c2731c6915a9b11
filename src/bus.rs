use std::{any::Any, future::Future, marker::PhantomData, panic::AssertUnwindSafe, sync::Arc};

use anyhow::{Error, anyhow};
use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, info, warn};

use crate::{
    error::BusError,
    models::{
        request::{Request, RequestKind, TypedRequest},
        response::ResponseEnvelope,
    },
};

pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Logic bound to exactly one request shape.
#[async_trait]
pub trait RequestHandler<R: TypedRequest>: Send + Sync {
    async fn handle(&self, request: R) -> Result<ResponseEnvelope, Error>;
}

/// Adapts an async closure into a [`RequestHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

#[async_trait]
impl<R, F, Fut> RequestHandler<R> for FnHandler<F>
where
    R: TypedRequest,
    F: Fn(R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ResponseEnvelope, Error>> + Send + 'static,
{
    async fn handle(&self, request: R) -> Result<ResponseEnvelope, Error> {
        (self.0)(request).await
    }
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn call(&self, request: Request) -> Result<ResponseEnvelope, Error>;
}

struct Typed<R, H> {
    handler: H,
    _request: PhantomData<fn(R)>,
}

#[async_trait]
impl<R, H> ErasedHandler for Typed<R, H>
where
    R: TypedRequest,
    H: RequestHandler<R>,
{
    async fn call(&self, request: Request) -> Result<ResponseEnvelope, Error> {
        let kind = request.kind();
        let typed = R::from_request(request)
            .ok_or_else(|| anyhow!("Request '{}' reached the handler for '{}'", kind, R::KIND))?;

        self.handler.handle(typed).await
    }
}

type HandlerSlot = Option<Arc<dyn ErasedHandler>>;

pub struct RequestBusBuilder {
    handlers: [HandlerSlot; RequestKind::COUNT],
    handler_timeout: Duration,
}

impl Default for RequestBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBusBuilder {
    pub fn new() -> Self {
        Self {
            handlers: std::array::from_fn(|_| None),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    pub fn with_handler_timeout(mut self, handler_timeout: Duration) -> Self {
        self.handler_timeout = handler_timeout;
        self
    }

    /// Binds `handler` to `R::KIND`. A second registration for the same kind
    /// is rejected.
    pub fn register<R, H>(&mut self, handler: H) -> Result<&mut Self, BusError>
    where
        R: TypedRequest,
        H: RequestHandler<R> + 'static,
    {
        let slot = &mut self.handlers[R::KIND.index()];

        if slot.is_some() {
            error!(kind = %R::KIND, "Duplicate handler registration");
            return Err(BusError::DuplicateHandler(R::KIND));
        }

        *slot = Some(Arc::new(Typed {
            handler,
            _request: PhantomData,
        }));

        info!(kind = %R::KIND, "Request handler registered");

        Ok(self)
    }

    pub fn build(self) -> RequestBus {
        let registered = self.handlers.iter().filter(|slot| slot.is_some()).count();
        info!(
            registered,
            handler_timeout_ms = self.handler_timeout.as_millis() as u64,
            "Request bus ready"
        );

        RequestBus {
            handlers: self.handlers,
            handler_timeout: self.handler_timeout,
        }
    }
}

/// Routes each request to the single handler registered for its kind.
///
/// The handler table is frozen at build time, so the bus can be shared
/// behind an `Arc` and dispatched from any number of tasks without locking.
pub struct RequestBus {
    handlers: [HandlerSlot; RequestKind::COUNT],
    handler_timeout: Duration,
}

impl RequestBus {
    pub fn builder() -> RequestBusBuilder {
        RequestBusBuilder::new()
    }

    pub fn is_registered(&self, kind: RequestKind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    pub fn registered_kinds(&self) -> Vec<RequestKind> {
        RequestKind::ALL
            .into_iter()
            .filter(|kind| self.is_registered(*kind))
            .collect()
    }

    /// Dispatches `request` and normalizes every bus-level error into a
    /// failed envelope.
    pub async fn dispatch(&self, request: Request) -> ResponseEnvelope {
        let kind = request.kind();

        match self.try_dispatch(request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Request dispatch failed");
                ResponseEnvelope::failure(e.to_string())
            }
        }
    }

    pub async fn try_dispatch(&self, request: Request) -> Result<ResponseEnvelope, BusError> {
        let kind = request.kind();

        let handler = self.handlers[kind.index()]
            .as_ref()
            .ok_or(BusError::NoHandlerRegistered(kind))?;

        debug!(kind = %kind, "Dispatching request");

        let call = AssertUnwindSafe(handler.call(request)).catch_unwind();

        match timeout(self.handler_timeout, call).await {
            Ok(Ok(Ok(envelope))) => {
                debug!(kind = %kind, success = envelope.success, "Request handled");
                Ok(envelope)
            }
            Ok(Ok(Err(e))) => Err(BusError::HandlerFault {
                kind,
                reason: format!("{:#}", e),
            }),
            Ok(Err(panic)) => Err(BusError::HandlerFault {
                kind,
                reason: panic_reason(panic.as_ref()),
            }),
            Err(_) => Err(BusError::HandlerTimeout {
                kind,
                timeout: self.handler_timeout,
            }),
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
