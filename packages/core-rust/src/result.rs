//! Routing outcome types shared between the router, policies, and consumer.

use crate::envelope::MessageEnvelope;

/// Placeholder used when the envelope was never parsed.
const UNKNOWN: &str = "unknown";

// ---------------------------------------------------------------------------
// HandlerResult
// ---------------------------------------------------------------------------

/// A handler's verdict for one message.
///
/// `should_delete = true` means the outcome is permanent (success or an
/// unrecoverable failure) and the message should be acknowledged to the
/// queue. `false` means the failure is transient: leave the message so the
/// queue redelivers it after its visibility timeout.
#[derive(Debug)]
pub struct HandlerResult {
    pub should_delete: bool,
    pub error: Option<anyhow::Error>,
}

impl HandlerResult {
    /// Permanent outcome, no error: acknowledge the message.
    #[must_use]
    pub fn delete() -> Self {
        Self {
            should_delete: true,
            error: None,
        }
    }

    /// Transient outcome, no error: leave the message for redelivery.
    #[must_use]
    pub fn retry() -> Self {
        Self {
            should_delete: false,
            error: None,
        }
    }

    /// Permanent failure: acknowledge the message and report the error.
    #[must_use]
    pub fn delete_with(error: anyhow::Error) -> Self {
        Self {
            should_delete: true,
            error: Some(error),
        }
    }

    /// Transient failure: leave the message for redelivery and report the error.
    #[must_use]
    pub fn retry_with(error: anyhow::Error) -> Self {
        Self {
            should_delete: false,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// RoutedResult
// ---------------------------------------------------------------------------

/// Complete outcome after a message has been routed and handled.
///
/// Always produced, whatever happened: the consumer inspects only
/// `handler_result` to decide delete-vs-retry and uses the identity fields
/// for logging. When the envelope could not be parsed, type and version are
/// the literal `"unknown"` and id/timestamp are empty.
#[derive(Debug)]
pub struct RoutedResult {
    pub message_type: String,
    pub message_version: String,
    pub handler_result: HandlerResult,
    pub message_id: String,
    pub timestamp: String,
}

impl RoutedResult {
    /// Result shape for a message whose envelope was never parsed.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            message_type: UNKNOWN.to_string(),
            message_version: UNKNOWN.to_string(),
            handler_result: HandlerResult::retry(),
            message_id: String::new(),
            timestamp: String::new(),
        }
    }

    /// Result shape carrying the envelope's identity fields verbatim.
    #[must_use]
    pub fn from_envelope(envelope: &MessageEnvelope) -> Self {
        Self {
            message_type: envelope.message_type.clone(),
            message_version: envelope.message_version.clone(),
            handler_result: HandlerResult::retry(),
            message_id: envelope.metadata.message_id().to_string(),
            timestamp: envelope.metadata.timestamp().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
