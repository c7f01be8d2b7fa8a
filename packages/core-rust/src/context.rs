use std::time::{Duration, Instant};

/// Per-message context threaded through middlewares, the routing pipeline,
/// policies, and handlers.
///
/// Carries the processing deadline the consumer granted this message.
/// Cancellation itself is structural (the consumer drops the route future
/// when the deadline elapses), so the context is an awareness mechanism:
/// cooperative handlers can check `remaining()` before starting work they
/// cannot finish in time and return a retry decision instead.
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    deadline: Option<Instant>,
}

impl RouteContext {
    /// Creates a context with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Creates a context that expires at the given instant.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Creates a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Returns the deadline, if one was set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time budget left before the deadline. `None` when no
    /// deadline was set; zero once the deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_expires() {
        let ctx = RouteContext::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_expired());
    }

    #[test]
    fn with_timeout_sets_future_deadline() {
        let ctx = RouteContext::with_timeout(Duration::from_secs(30));
        assert!(!ctx.is_expired());
        let remaining = ctx.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(30));
        assert!(remaining > Duration::from_secs(29));
    }

    #[test]
    fn past_deadline_is_expired() {
        let ctx = RouteContext::with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }
}
