//! The facts domain: typed request arguments, the upstream client with its
//! cache, sorting and id assignment, and the `/api/facts` handler.
//!
//! A request flows through these pieces in order:
//!
//! ```text
//! query string ─► query::parse_query ─► FactClient::fetch ─► sort::apply_sort
//!                                         (cache / upstream)    sort::assign_ids ─► JSON
//! ```

pub mod client;
pub mod handler;
pub mod model;
pub mod query;
pub mod sort;

pub use client::{FactClient, FactSource, HttpFactSource, UpstreamError, UpstreamResult};
pub use handler::FactsHandler;
pub use model::{Fact, FactPage, FactRequestArgs, FetchArgs, SortOrder};
pub use query::{QueryDefaults, parse_query};
pub use sort::{SortKey, apply_sort, assign_ids, sort_facts};
