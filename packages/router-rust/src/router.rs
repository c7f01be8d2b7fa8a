//! Message routing: registry, core pipeline, and middleware orchestration.
//!
//! `route` never returns an error and never lets a panic escape. Failures
//! are classified at the site where they occur, decided once by the failure
//! policy, and encoded into the returned [`RoutedResult`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use parking_lot::RwLock;

use courier_core::{
    HandlerKey, HandlerResult, MessageEnvelope, MessageMetadata, RouteContext, RoutedResult,
    SchemaValidator,
};

use crate::error::RouteError;
use crate::failure::{FailureKind, FailurePolicy, ImmediateDeletePolicy};
use crate::handler::MessageHandler;
use crate::middleware::{ChainError, ChainResult, Middleware, Next};
use crate::routing::RoutingPolicy;

// ---------------------------------------------------------------------------
// RouteState
// ---------------------------------------------------------------------------

/// Per-message scratch state threaded through the middleware chain.
///
/// Fields fill in as the pipeline advances; a middleware observing the state
/// after `next` returns sees everything the core resolved before the message
/// succeeded or failed.
pub struct RouteState {
    /// Raw message bytes as received from the queue.
    pub raw: Bytes,
    /// Parsed envelope, set once envelope decoding succeeds.
    pub envelope: Option<MessageEnvelope>,
    /// Handler key selected by the routing policy.
    pub handler_key: Option<HandlerKey>,
    /// Whether a handler is registered under the selected key.
    pub handler_found: bool,
    /// Whether a payload schema is registered under the selected key.
    pub schema_found: bool,
    /// Metadata for the handler invocation, set once a handler is resolved.
    pub metadata: Option<MessageMetadata>,
    /// Resolved handler, if one is registered under the selected key.
    pub handler: Option<Arc<dyn MessageHandler>>,
    /// Resolved payload schema, if one is registered under the selected key.
    pub schema: Option<Arc<SchemaValidator>>,
}

impl RouteState {
    fn new(raw: Bytes) -> Self {
        Self {
            raw,
            envelope: None,
            handler_key: None,
            handler_found: false,
            schema_found: false,
            metadata: None,
            handler: None,
            schema: None,
        }
    }

    /// Builds a result from whatever the pipeline has resolved so far:
    /// envelope identity fields when the envelope parsed, `"unknown"`
    /// placeholders otherwise.
    #[must_use]
    pub fn provisional_result(&self) -> RoutedResult {
        match &self.envelope {
            Some(envelope) => RoutedResult::from_envelope(envelope),
            None => RoutedResult::unknown(),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Registrations guarded by the router's reader-writer lock.
struct Registry {
    handlers: HashMap<HandlerKey, Arc<dyn MessageHandler>>,
    schemas: HashMap<HandlerKey, Arc<SchemaValidator>>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

/// Routes raw queue messages to registered handlers.
///
/// Safe for concurrent use: routing takes the read lock only long enough to
/// snapshot what it needs, so a long-running handler never blocks
/// registration. Newly added middlewares affect only route calls that start
/// after the registration.
pub struct Router {
    registry: RwLock<Registry>,
    envelope_schema: SchemaValidator,
    routing_policy: Option<Arc<dyn RoutingPolicy>>,
    failure_policy: Arc<dyn FailurePolicy>,
}

impl Router {
    /// Creates a router, compiling the envelope schema once.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidEnvelopeSchema`] when the schema does
    /// not compile.
    pub fn new(envelope_schema: &str) -> Result<Self, RouteError> {
        let envelope_schema =
            SchemaValidator::compile(envelope_schema).map_err(RouteError::InvalidEnvelopeSchema)?;
        Ok(Self {
            registry: RwLock::new(Registry {
                handlers: HashMap::new(),
                schemas: HashMap::new(),
                middlewares: Vec::new(),
            }),
            envelope_schema,
            routing_policy: None,
            failure_policy: Arc::new(ImmediateDeletePolicy),
        })
    }

    /// Replaces the failure policy. Defaults to [`ImmediateDeletePolicy`].
    #[must_use]
    pub fn with_failure_policy(mut self, policy: impl FailurePolicy + 'static) -> Self {
        self.failure_policy = Arc::new(policy);
        self
    }

    /// Sets a routing policy. Without one the router derives the exact
    /// `messageType:messageVersion` key directly.
    #[must_use]
    pub fn with_routing_policy(mut self, policy: impl RoutingPolicy + 'static) -> Self {
        self.routing_policy = Some(Arc::new(policy));
        self
    }

    /// Registers a handler for a type/version pair. Overwrites by key, last
    /// writer wins.
    pub fn register(
        &self,
        message_type: &str,
        message_version: &str,
        handler: impl MessageHandler + 'static,
    ) {
        let key = HandlerKey::new(message_type, message_version);
        self.registry.write().handlers.insert(key, Arc::new(handler));
    }

    /// Registers a payload schema for a type/version pair. The schema is
    /// compiled here; on compile failure nothing is registered.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidSchema`] when the schema does not
    /// compile.
    pub fn register_schema(
        &self,
        message_type: &str,
        message_version: &str,
        schema: &str,
    ) -> Result<(), RouteError> {
        let key = HandlerKey::new(message_type, message_version);
        let compiled = SchemaValidator::compile(schema).map_err(|source| {
            RouteError::InvalidSchema {
                key: key.clone(),
                source,
            }
        })?;
        self.registry.write().schemas.insert(key, Arc::new(compiled));
        Ok(())
    }

    /// Appends a middleware. The first middleware registered runs outermost:
    /// first to see the message, last to see the result.
    pub fn use_middleware(&self, middleware: impl Middleware + 'static) {
        self.registry.write().middlewares.push(Arc::new(middleware));
    }

    /// Routes a raw message to its handler and returns the decided outcome.
    ///
    /// Always returns a [`RoutedResult`]; errors and panics are classified,
    /// decided by the failure policy, and folded into the result.
    pub async fn route(&self, ctx: &RouteContext, raw: Bytes) -> RoutedResult {
        let mut state = RouteState::new(raw);
        let middlewares = self.registry.read().middlewares.clone();

        let outcome = {
            let chain = Next::new(self, &middlewares);
            AssertUnwindSafe(chain.run(ctx, &mut state))
                .catch_unwind()
                .await
        };

        match outcome {
            Ok(Ok(result)) => result,
            // Already decided inside the core; re-deciding here would apply
            // the policy twice to one failure.
            Ok(Err(ChainError::Core { result, .. })) => result,
            Ok(Err(ChainError::Middleware { source, result })) => {
                let mut result = result.unwrap_or_else(|| state.provisional_result());
                let current =
                    std::mem::replace(&mut result.handler_result, HandlerResult::retry());
                let cause = RouteError::Middleware(source);
                result.handler_result = self.failure_policy.decide(
                    ctx,
                    FailureKind::MiddlewareError,
                    Some(cause.into()),
                    current,
                );
                result
            }
            Err(panic) => {
                let cause = RouteError::HandlerPanic(panic_message(panic.as_ref()));
                let mut result = state.provisional_result();
                result.handler_result = self.failure_policy.decide(
                    ctx,
                    FailureKind::HandlerPanic,
                    Some(cause.into()),
                    HandlerResult::retry(),
                );
                result
            }
        }
    }

    /// Core pipeline: envelope validation, parse, handler resolution,
    /// payload validation, handler invocation.
    ///
    /// Failures are decided by the policy here and returned as
    /// [`ChainError::Core`] so `route` does not decide them again. Panics
    /// are not caught here; they bubble to the guard in `route`.
    pub(crate) async fn core_route(
        &self,
        ctx: &RouteContext,
        state: &mut RouteState,
    ) -> ChainResult {
        // Step 1: validate the envelope structure before any parsing.
        if let Err(err) = self.envelope_schema.validate_bytes(&state.raw) {
            return Err(self.core_failure(
                ctx,
                RoutedResult::unknown(),
                FailureKind::EnvelopeSchema,
                RouteError::InvalidEnvelope(err),
            ));
        }

        // Step 2: decode the envelope to extract routing fields and payload.
        let envelope: MessageEnvelope = match serde_json::from_slice(&state.raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                return Err(self.core_failure(
                    ctx,
                    RoutedResult::unknown(),
                    FailureKind::EnvelopeParse,
                    RouteError::EnvelopeParse(err),
                ));
            }
        };
        state.envelope = Some(envelope.clone());

        // Step 3: select the handler key, then resolve handler and payload
        // schema under one read-lock acquisition.
        let selected = match &self.routing_policy {
            None => Some(envelope.handler_key()),
            Some(policy) => {
                let available: Vec<HandlerKey> =
                    self.registry.read().handlers.keys().cloned().collect();
                policy.select(ctx, &envelope, &available)
            }
        };
        state.handler_key = selected.clone();

        if let Some(key) = &selected {
            let registry = self.registry.read();
            state.handler = registry.handlers.get(key).cloned();
            state.schema = registry.schemas.get(key).cloned();
        }
        state.handler_found = state.handler.is_some();
        state.schema_found = state.schema.is_some();

        // Step 4: a registered payload schema is enforced before the
        // handler-existence check, so a schema-only key still validates.
        if let Some(schema) = &state.schema {
            if let Err(err) = schema.validate_bytes(envelope.payload()) {
                return Err(self.core_failure(
                    ctx,
                    RoutedResult::from_envelope(&envelope),
                    FailureKind::PayloadSchema,
                    RouteError::InvalidPayload(err),
                ));
            }
        }

        // Step 5: fail unhandled messages for this key.
        let Some(handler) = state.handler.clone() else {
            let cause = match selected {
                Some(key) => RouteError::NoHandler { key },
                None => RouteError::NoHandlerSelected,
            };
            return Err(self.core_failure(
                ctx,
                RoutedResult::from_envelope(&envelope),
                FailureKind::NoHandler,
                cause,
            ));
        };

        // Step 6: hand the payload and the verbatim metadata slice to the
        // handler. Panics bubble to the guard in `route`.
        state.metadata = Some(envelope.metadata.clone());
        let payload = Bytes::copy_from_slice(envelope.payload());
        let metadata = Bytes::copy_from_slice(envelope.metadata.as_json().as_bytes());
        let handler_result = handler.handle(ctx.clone(), payload, metadata).await;

        let mut result = RoutedResult::from_envelope(&envelope);
        if handler_result.error.is_some() {
            // The policy is the final decider for handler errors; it may
            // respect or override the handler's delete intent.
            result.handler_result =
                self.failure_policy
                    .decide(ctx, FailureKind::HandlerError, None, handler_result);
        } else {
            result.handler_result = handler_result;
        }
        Ok(result)
    }

    /// Consults the failure policy for a core failure and tags the decided
    /// result so `route` passes it through untouched.
    fn core_failure(
        &self,
        ctx: &RouteContext,
        mut result: RoutedResult,
        kind: FailureKind,
        cause: RouteError,
    ) -> ChainError {
        result.handler_result =
            self.failure_policy
                .decide(ctx, kind, Some(cause.into()), HandlerResult::retry());
        ChainError::Core { kind, result }
    }
}

/// Best-effort extraction of a panic payload into a message.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
