//! Tracing middleware: records per-message timing and outcome using
//! `tracing` spans, not a full metrics crate.

use std::time::Instant;

use async_trait::async_trait;
use courier_core::RouteContext;
use tracing::{info_span, Instrument};

use super::{ChainError, ChainResult, Middleware, Next};
use crate::router::RouteState;

/// Records routing duration and outcome in a `tracing` span for every
/// message, including ones that fail before handler resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

#[async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(
        &self,
        ctx: &RouteContext,
        state: &mut RouteState,
        next: Next<'_>,
    ) -> ChainResult {
        let span = info_span!(
            "route",
            message_type = tracing::field::Empty,
            message_version = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = next.run(ctx, state).await;

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            let outcome = match &result {
                Ok(routed) if routed.handler_result.error.is_none() => "ok",
                Ok(_) => "handler_error",
                Err(ChainError::Core { .. }) => "core_failure",
                Err(ChainError::Middleware { .. }) => "middleware_error",
            };

            let span = tracing::Span::current();
            if let Some(envelope) = &state.envelope {
                span.record("message_type", envelope.message_type.as_str());
                span.record("message_version", envelope.message_version.as_str());
            }
            span.record("duration_ms", duration_ms);
            span.record("outcome", outcome);

            tracing::info!(duration_ms, outcome, "message routed");

            result
        }
        .instrument(span)
        .await
    }
}
