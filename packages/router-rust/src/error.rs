//! Error types for the routing pipeline and registry.

use courier_core::{HandlerKey, SchemaError};
use thiserror::Error;

/// Errors produced by the router.
///
/// Construction and registration errors (`InvalidEnvelopeSchema`,
/// `InvalidSchema`) are returned to the caller directly. The remaining
/// variants never escape `route`: they are wrapped as the inner cause handed
/// to the failure policy and surface, if the policy keeps them, inside
/// `RoutedResult::handler_result`.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The envelope schema given at construction failed to compile.
    #[error("invalid envelope schema: {0}")]
    InvalidEnvelopeSchema(#[source] SchemaError),

    /// A payload schema failed to compile during registration.
    #[error("invalid schema for {key}: {source}")]
    InvalidSchema {
        key: HandlerKey,
        #[source]
        source: SchemaError,
    },

    /// The raw message failed envelope schema validation.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] SchemaError),

    /// The raw message could not be decoded into an envelope.
    #[error("failed to parse envelope: {0}")]
    EnvelopeParse(#[source] serde_json::Error),

    /// The payload failed the schema registered for its key.
    #[error("invalid message payload: {0}")]
    InvalidPayload(#[source] SchemaError),

    /// No handler is registered under the selected key.
    #[error("no handler registered for {key}")]
    NoHandler { key: HandlerKey },

    /// The routing policy declined to select a handler.
    #[error("no handler selected by routing policy")]
    NoHandlerSelected,

    /// A panic escaped a handler or middleware.
    #[error("panic during message processing: {0}")]
    HandlerPanic(String),

    /// A middleware surfaced an error.
    #[error("middleware error: {0}")]
    Middleware(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_handler_display_names_the_key() {
        let err = RouteError::NoHandler {
            key: HandlerKey::new("T", "v1"),
        };
        assert_eq!(err.to_string(), "no handler registered for T:v1");
    }

    #[test]
    fn middleware_display_includes_cause() {
        let err = RouteError::Middleware(anyhow::anyhow!("mw-fail"));
        assert_eq!(err.to_string(), "middleware error: mw-fail");
    }
}
