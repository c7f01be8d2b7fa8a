//! Failure classification and the delete-vs-retry policy seam.
//!
//! Every delete/retry decision on an error path flows through one
//! [`FailurePolicy`], so operators can swap recovery strategies (delete
//! permanent failures vs delegate everything to queue redrive) without
//! touching the pipeline.

mod immediate;
mod redrive;

pub use immediate::ImmediateDeletePolicy;
pub use redrive::QueueRedrivePolicy;

use courier_core::{HandlerResult, RouteContext};

/// Where in the pipeline a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No failure occurred.
    None,
    /// The outer envelope JSON failed schema validation.
    EnvelopeSchema,
    /// The outer envelope JSON could not be decoded.
    EnvelopeParse,
    /// The message payload failed its registered schema validation.
    PayloadSchema,
    /// No handler was registered or selected for the message.
    NoHandler,
    /// The handler returned an error. Policies may respect or override the
    /// handler's delete decision.
    HandlerError,
    /// A panic escaped the handler or a middleware.
    HandlerPanic,
    /// A middleware surfaced an error that has not yet been policy-decided.
    MiddlewareError,
}

/// Central decider for the final delete-vs-retry outcome of a failure.
///
/// Consulted exactly once per failure site. Implementations must be pure:
/// the same inputs produce the same decision, with no side effects and no
/// panics.
///
/// `inner` carries the failure cause when it is not already attached to
/// `current` (for `HandlerError` the handler's own error is already in
/// `current`). Policies that attach `inner` should do so only when
/// `current.error` is empty, so a contextual error supplied at the failure
/// site is never overwritten by a lower-level cause.
pub trait FailurePolicy: Send + Sync {
    fn decide(
        &self,
        ctx: &RouteContext,
        kind: FailureKind,
        inner: Option<anyhow::Error>,
        current: HandlerResult,
    ) -> HandlerResult;
}
