use courier_core::{HandlerResult, RouteContext};

use super::{FailureKind, FailurePolicy};

/// Never deletes on failure: every failed message is left for the queue's
/// native redrive, so retries and dead-lettering happen queue-side.
///
/// Suited to queues configured with a redrive policy and a DLQ; the maximum
/// receive count then bounds how often a permanently broken message cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueRedrivePolicy;

impl FailurePolicy for QueueRedrivePolicy {
    fn decide(
        &self,
        _ctx: &RouteContext,
        kind: FailureKind,
        inner: Option<anyhow::Error>,
        mut current: HandlerResult,
    ) -> HandlerResult {
        if kind == FailureKind::None {
            return current;
        }
        current.should_delete = false;
        if current.error.is_none() {
            current.error = inner;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_is_left_for_redrive() {
        for kind in [
            FailureKind::EnvelopeSchema,
            FailureKind::EnvelopeParse,
            FailureKind::PayloadSchema,
            FailureKind::NoHandler,
            FailureKind::HandlerError,
            FailureKind::HandlerPanic,
            FailureKind::MiddlewareError,
        ] {
            let decided = QueueRedrivePolicy.decide(
                &RouteContext::new(),
                kind,
                Some(anyhow::anyhow!("cause")),
                HandlerResult::delete(),
            );
            assert!(!decided.should_delete, "{kind:?} must not delete");
            assert!(decided.error.is_some());
        }
    }

    #[test]
    fn none_passes_through_untouched() {
        let decided = QueueRedrivePolicy.decide(
            &RouteContext::new(),
            FailureKind::None,
            None,
            HandlerResult::delete(),
        );
        assert!(decided.should_delete);
    }

    #[test]
    fn existing_error_is_preserved() {
        let decided = QueueRedrivePolicy.decide(
            &RouteContext::new(),
            FailureKind::HandlerError,
            Some(anyhow::anyhow!("lower-level")),
            HandlerResult::delete_with(anyhow::anyhow!("contextual")),
        );
        assert!(!decided.should_delete);
        assert_eq!(decided.error.unwrap().to_string(), "contextual");
    }
}
