use courier_core::{HandlerKey, MessageEnvelope, RouteContext};

use super::RoutingPolicy;

/// Selects the handler whose key exactly matches
/// `messageType:messageVersion`, or nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchPolicy;

impl RoutingPolicy for ExactMatchPolicy {
    fn select(
        &self,
        _ctx: &RouteContext,
        envelope: &MessageEnvelope,
        available: &[HandlerKey],
    ) -> Option<HandlerKey> {
        let want = envelope.handler_key();
        available.contains(&want).then_some(want)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(message_type: &str, message_version: &str) -> MessageEnvelope {
        serde_json::from_str(&format!(
            r#"{{
                "schemaVersion": "1.0",
                "messageType": "{message_type}",
                "messageVersion": "{message_version}",
                "message": {{}},
                "metadata": {{}}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn selects_exact_key_when_available() {
        let available = [HandlerKey::new("T", "v1"), HandlerKey::new("U", "v1")];
        let selected =
            ExactMatchPolicy.select(&RouteContext::new(), &envelope("T", "v1"), &available);
        assert_eq!(selected, Some(HandlerKey::new("T", "v1")));
    }

    #[test]
    fn no_selection_when_key_absent() {
        let available = [HandlerKey::new("T", "v1")];
        let selected =
            ExactMatchPolicy.select(&RouteContext::new(), &envelope("T", "v2"), &available);
        assert_eq!(selected, None);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let available = [HandlerKey::new("T", "v1")];
        let selected =
            ExactMatchPolicy.select(&RouteContext::new(), &envelope("t", "v1"), &available);
        assert_eq!(selected, None);
    }
}
