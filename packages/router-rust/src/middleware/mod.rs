//! Cross-cutting middleware around the routing core.
//!
//! Middlewares wrap the whole pipeline, so they see every message, including
//! ones that fail envelope validation before a handler is even considered.
//! They run in registration order on the way in and reverse order on the way
//! out.

mod tracing;

pub use self::tracing::TracingMiddleware;

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::{RouteContext, RoutedResult};

use crate::failure::FailureKind;
use crate::router::{RouteState, Router};

// ---------------------------------------------------------------------------
// ChainError
// ---------------------------------------------------------------------------

/// Internal error flowing out of the middleware chain.
///
/// The two variants carry the one distinction `route` needs: whether the
/// failure policy has already ruled. `Core` failures were classified and
/// decided inside the core pipeline; `route` returns their result untouched.
/// `Middleware` errors have not seen the policy; `route` consults it exactly
/// once with [`FailureKind::MiddlewareError`].
#[derive(Debug)]
pub enum ChainError {
    /// A failure already decided by the failure policy inside the core.
    Core {
        kind: FailureKind,
        result: RoutedResult,
    },
    /// An error surfaced by a middleware, not yet policy-decided.
    Middleware {
        source: anyhow::Error,
        /// The inner result, when the middleware had one to pass along.
        result: Option<RoutedResult>,
    },
}

impl ChainError {
    /// Wraps a middleware error raised before any result existed.
    #[must_use]
    pub fn middleware(source: anyhow::Error) -> Self {
        Self::Middleware {
            source,
            result: None,
        }
    }

    /// Wraps a middleware error while passing the inner result along.
    #[must_use]
    pub fn middleware_with_result(source: anyhow::Error, result: RoutedResult) -> Self {
        Self::Middleware {
            source,
            result: Some(result),
        }
    }
}

/// Outcome of one link of the chain.
pub type ChainResult = Result<RoutedResult, ChainError>;

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// A wrapper around the routing core.
///
/// Implementations may inspect or mutate the [`RouteState`], invoke `next`
/// zero, one, or more times, transform the returned result, or surface an
/// error via [`ChainError::middleware`]. Each message gets its own
/// `RouteState`; a middleware sharing mutable state across messages must
/// synchronize it itself.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        ctx: &RouteContext,
        state: &mut RouteState,
        next: Next<'_>,
    ) -> ChainResult;
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Continuation over the remaining chain, ending at the routing core.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    router: &'a Router,
    middlewares: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(router: &'a Router, middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            router,
            middlewares,
        }
    }

    /// Invokes the rest of the chain. `Next` is `Copy`, so a middleware can
    /// hold on to it and call it more than once, or not at all.
    pub async fn run(self, ctx: &RouteContext, state: &mut RouteState) -> ChainResult {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    router: self.router,
                    middlewares: rest,
                };
                head.handle(ctx, state, next).await
            }
            None => self.router.core_route(ctx, state).await,
        }
    }
}
