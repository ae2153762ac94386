//! Per-request context handed to middleware and route handlers.

use crate::http::{Method, QueryParams, Request};

/// Per-request context.
///
/// Owned by exactly one request; nothing inside it is shared across requests.
#[derive(Debug)]
pub struct Context {
    request: Request,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn query(&self) -> &QueryParams {
        self.request.query()
    }
}
