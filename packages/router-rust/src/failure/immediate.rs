use courier_core::{HandlerResult, RouteContext};

use super::{FailureKind, FailurePolicy};

/// Default policy: structural and permanent failures are deleted
/// immediately, handler and middleware errors keep the current decision.
///
/// A malformed envelope or payload will never succeed on redelivery, so
/// retrying it only burns receive cycles until the queue's redrive kicks in.
/// Handler errors honour the handler's own `should_delete` intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDeletePolicy;

impl FailurePolicy for ImmediateDeletePolicy {
    fn decide(
        &self,
        _ctx: &RouteContext,
        kind: FailureKind,
        inner: Option<anyhow::Error>,
        mut current: HandlerResult,
    ) -> HandlerResult {
        match kind {
            FailureKind::None => current,
            FailureKind::EnvelopeSchema
            | FailureKind::EnvelopeParse
            | FailureKind::PayloadSchema
            | FailureKind::NoHandler
            | FailureKind::HandlerPanic => {
                current.should_delete = true;
                if current.error.is_none() {
                    current.error = inner;
                }
                current
            }
            FailureKind::HandlerError | FailureKind::MiddlewareError => {
                if current.error.is_none() {
                    current.error = inner;
                }
                current
            }
        }
    }
}
