//! Wiring: turns configuration into a ready-to-serve [`Router`].

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::context::Context;
use crate::facts::{FactClient, FactSource, FactsHandler, HttpFactSource};
use crate::middleware::LoggerMiddleware;
use crate::router::Router;

/// Path of the facts endpoint.
pub const FACTS_PATH: &str = "/api/facts";

/// Builds the application router around an already constructed client.
///
/// The facts route accepts every method so the handler itself can answer
/// non-`GET` requests with `405`.
pub fn router(handler: FactsHandler) -> Router {
    let mut router = Router::new();
    router.layer(LoggerMiddleware);
    router.any(FACTS_PATH, move |ctx: Context| {
        let handler = handler.clone();
        async move { handler.handle(ctx).await }
    });
    router
}

/// Builds the router with `source` as the upstream and caching per `config`.
pub fn router_with_source(source: Arc<dyn FactSource>, config: &ApiConfig) -> Router {
    let client = FactClient::from_config(source, config);
    router(FactsHandler::new(Arc::new(client), config.query_defaults()))
}

/// Builds the production router talking HTTP to `config.base_url`.
///
/// # Errors
///
/// Fails when the HTTP client cannot be constructed.
pub fn build_router(config: &ApiConfig) -> Result<Router, reqwest::Error> {
    let source = HttpFactSource::from_config(config)?;
    Ok(router_with_source(Arc::new(source), config))
}
