//! Courier Router — JSON-envelope message routing and queue consumption.
//!
//! Binds a middleware-wrapped routing pipeline to an abstract queue client:
//! messages are schema-validated, parsed, dispatched to handlers registered
//! by `(messageType, messageVersion)`, and acknowledged or left for
//! redelivery according to a pluggable failure policy. The queue is assumed
//! at-least-once; handlers must be idempotent.

pub mod consumer;
pub mod error;
pub mod failure;
pub mod handler;
pub mod middleware;
pub mod router;
pub mod routing;
pub mod shutdown;

pub use courier_core::{
    HandlerKey, HandlerResult, MessageEnvelope, MessageMetadata, RouteContext, RoutedResult,
    SchemaError, SchemaValidator, ENVELOPE_SCHEMA,
};

pub use consumer::{Consumer, ConsumerConfig, QueueClient, QueueMessage};
pub use error::RouteError;
pub use failure::{FailureKind, FailurePolicy, ImmediateDeletePolicy, QueueRedrivePolicy};
pub use handler::{HandlerFn, MessageHandler};
pub use middleware::{ChainError, ChainResult, Middleware, Next, TracingMiddleware};
pub use router::{RouteState, Router};
pub use routing::{ExactMatchPolicy, RoutingPolicy};
pub use shutdown::{ConsumerState, ShutdownController};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
