//! Middleware pipeline: composable logic wrapped around route handlers.
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain; call [`Next::run`] to advance.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`LoggerMiddleware`]: one `tracing` line per request.

use std::{future::Future, pin::Pin, sync::Arc};
use tokio::time::Instant;

use crate::{Response, StatusCode, context::Context};

/// Boxed, `Send` response future returned by every middleware and handler.
pub type BoxResponseFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// A type-erased, reference-counted middleware function.
///
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler =
    Arc<dyn Fn(Context, Next) -> BoxResponseFuture + Send + Sync + 'static>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each layer can forward at most
/// once and a request can never produce two responses.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given stack.
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// An exhausted chain yields a `500` as a safe fallback.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = self.middlewares[self.index].clone();
            self.index += 1;
            handler(ctx, self).await
        } else {
            Response::new(StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// The core middleware trait.
///
/// Implementors may pass through (`next.run(ctx).await`), short-circuit by
/// returning a [`Response`] directly, or decorate the downstream response.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> BoxResponseFuture;
}

/// Logs each request's method, path, status, and duration.
///
/// ```text
/// GET /api/facts - 200 (1.52ms)
/// ```
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> BoxResponseFuture {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.method().as_str().to_owned();
            let path = ctx.path().to_owned();

            let response = next.run(ctx).await;

            tracing::info!(
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "{} {} - {}",
                method,
                path,
                response.status().as_u16()
            );

            response
        })
    }
}
