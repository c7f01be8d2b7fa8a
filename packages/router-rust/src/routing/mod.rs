//! Handler selection policy seam.

mod exact_match;

pub use exact_match::ExactMatchPolicy;

use courier_core::{HandlerKey, MessageEnvelope, RouteContext};

/// Selects which registered handler key an envelope routes to.
///
/// The full snapshot of registered keys is passed in, keeping policies pure
/// functions with no back-reference into the registry. Returning `None`
/// means "no selection"; the router then fails the message as unhandled.
///
/// The built-in [`ExactMatchPolicy`] fixes the library's canonical behavior;
/// version-fallback or A/B selection policies are user-supplied.
pub trait RoutingPolicy: Send + Sync {
    fn select(
        &self,
        ctx: &RouteContext,
        envelope: &MessageEnvelope,
        available: &[HandlerKey],
    ) -> Option<HandlerKey>;
}
