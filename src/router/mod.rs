//! Request routing: map URL paths and HTTP methods to handler functions.
//!
//! Paths match exactly, with trailing slashes normalized on both sides, so
//! `/api/facts/` and `/api/facts` are equivalent. A route is either bound to
//! one method ([`Router::get`]) or to every method ([`Router::any`]); the
//! latter lets a handler answer unsupported methods itself, e.g. with `405`.
//!
//! Routes are matched in registration order and every dispatch, including the
//! `404` fallback, runs through the middleware stack added with [`Router::layer`].

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{BoxResponseFuture, Middleware, MiddlewareHandler, Next, from_middleware};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased, heap-allocated async handler.
pub type Handler = Arc<dyn Fn(Context) -> BoxResponseFuture + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait via the blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> BoxResponseFuture;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxResponseFuture {
        Box::pin((self)(ctx))
    }
}

// Strip a trailing slash from everything but the root path.
fn normalize(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

// A single registered route. `method == None` accepts every method.
struct Route {
    method: Option<Method>,
    path: String,
    handler: Handler,
}

impl Route {
    fn matches(&self, method: &Method, path: &str) -> bool {
        self.path == normalize(path) && self.method.as_ref().is_none_or(|m| m == method)
    }
}

/// HTTP request router.
///
/// # Examples
///
/// ```rust,no_run
/// use catfacts::context::Context;
/// use catfacts::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/ping", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// router.any("/api/facts", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    middlewares: Vec<MiddlewareHandler>,
}

impl Router {
    /// Create a new, empty `Router` with no routes and no middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `GET` requests on `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Some(Method::Get), path, handler);
    }

    /// Register a handler for every method on `path`.
    pub fn any(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(None, path, handler);
    }

    /// Append a middleware to the stack. Earlier layers wrap later ones.
    pub fn layer<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
    }

    fn add_route(&mut self, method: Option<Method>, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method,
            path: normalize(path).to_owned(),
            handler,
        });
    }

    /// Return the number of routes registered in this router.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` through the middleware stack to the first matching route.
    ///
    /// When no route matches, the stack still runs and ends in `404 Not Found`.
    pub async fn route(&self, request: Request) -> Response {
        let matched = self
            .routes
            .iter()
            .find(|route| route.matches(request.method(), request.path()))
            .map(|route| Arc::clone(&route.handler));

        let endpoint: MiddlewareHandler = match matched {
            Some(handler) => Arc::new(move |ctx: Context, _next: Next| handler(ctx)),
            None => Arc::new(|_ctx: Context, _next: Next| -> BoxResponseFuture {
                Box::pin(async { Response::new(StatusCode::NotFound).body("Not Found") })
            }),
        };

        let mut chain = self.middlewares.clone();
        chain.push(endpoint);
        Next::new(chain).run(Context::new(request)).await
    }
}
