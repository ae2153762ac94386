//! # catfacts
//!
//! An async HTTP service that proxies a paginated "cat facts" API, sorts the
//! results on request, numbers them per page, and caches upstream pages in memory.
//!
//! `GET /api/facts?perPage=&page=&maxLength=&sortByLength=&sortByAlphabet=`
//! answers with `{currentPage, perPage, totalPages, facts: [{fact, length, id}]}`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use catfacts::config::{AppConfig, Env};
//! use catfacts::{Server, app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env(&mut Env::from_process())?;
//!     let router = app::build_router(&config.api)?;
//!     let server = Server::bind(&config.server.bind_addr).await?;
//!     server.serve(router).await?;
//!     Ok(())
//! }
//! ```

// ── HTTP plumbing ─────────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

// ── Service ───────────────────────────────────────────────────────────────────
pub mod app;
pub mod cache;
pub mod config;
pub mod facts;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
