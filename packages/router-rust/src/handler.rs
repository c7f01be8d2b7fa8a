//! User-facing handler contract.

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use courier_core::{HandlerResult, RouteContext};

/// Processes messages for one `(messageType, messageVersion)` registration.
///
/// The payload and metadata arrive as the raw JSON bytes carried by the
/// envelope, keeping handlers decoupled from the envelope struct. Handlers
/// run concurrently across messages and must be safe for concurrent
/// invocation. The queue is at-least-once: a handler may see the same
/// message again, so processing must be idempotent.
///
/// Returning `should_delete = true` acknowledges the message whatever the
/// error field says; `false` leaves it for visibility-timeout redelivery.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: RouteContext, payload: Bytes, metadata: Bytes) -> HandlerResult;
}

/// Adapts an async closure into a [`MessageHandler`].
///
/// ```ignore
/// router.register("UserCreated", "v1", HandlerFn::new(|_ctx, payload, _meta| async move {
///     match serde_json::from_slice::<UserCreated>(&payload) {
///         Ok(event) => process(event).await,
///         Err(err) => HandlerResult::delete_with(err.into()),
///     }
/// }));
/// ```
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for HandlerFn<F>
where
    F: Fn(RouteContext, Bytes, Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: RouteContext, payload: Bytes, metadata: Bytes) -> HandlerResult {
        (self.0)(ctx, payload, metadata).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_adapter_invokes_the_closure() {
        let handler = HandlerFn::new(|_ctx, payload: Bytes, metadata: Bytes| async move {
            assert_eq!(&payload[..], b"{}");
            assert_eq!(&metadata[..], b"{\"messageId\":\"id-1\"}");
            HandlerResult::delete()
        });
        let result = handler
            .handle(
                RouteContext::new(),
                Bytes::from_static(b"{}"),
                Bytes::from_static(b"{\"messageId\":\"id-1\"}"),
            )
            .await;
        assert!(result.should_delete);
    }
}
