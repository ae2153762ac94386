//! Request Handler for `/api/facts`.
//!
//! `MethodCheck → Parse → Fetch → (Error | Sort + Assign ids → Respond)`.
//! Every branch ends in exactly one returned [`Response`].

use std::sync::Arc;

use tracing::{debug, error};

use crate::context::Context;
use crate::http::{Method, Response, StatusCode};

use super::client::FactClient;
use super::query::{QueryDefaults, parse_query};
use super::sort::{apply_sort, assign_ids};

pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";

/// Cheaply cloneable handler shared by every connection task.
#[derive(Clone)]
pub struct FactsHandler {
    client: Arc<FactClient>,
    defaults: QueryDefaults,
}

impl FactsHandler {
    pub fn new(client: Arc<FactClient>, defaults: QueryDefaults) -> Self {
        Self { client, defaults }
    }

    /// Answers one `/api/facts` request.
    ///
    /// The pipeline runs on its own task, so a panic anywhere in it still
    /// produces the generic `500` body.
    pub async fn handle(&self, ctx: Context) -> Response {
        let handler = self.clone();
        match tokio::spawn(async move { handler.respond(ctx).await }).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "fact request aborted");
                Response::error(StatusCode::InternalServerError, SOMETHING_WENT_WRONG)
            }
        }
    }

    async fn respond(&self, ctx: Context) -> Response {
        if ctx.method() != &Method::Get {
            return Response::error(StatusCode::MethodNotAllowed, METHOD_NOT_ALLOWED)
                .header("Allow", "GET");
        }

        let args = parse_query(ctx.query(), &self.defaults);
        debug!(?args, "parsed fact request");

        let mut page = match self.client.fetch(&args.fetch_args()).await {
            Ok(page) => page,
            Err(_) => {
                return Response::error(StatusCode::InternalServerError, SOMETHING_WENT_WRONG);
            }
        };

        apply_sort(&mut page.facts, &args);
        assign_ids(&mut page.facts, args.page, args.limit);
        Response::json(StatusCode::Ok, &page)
    }
}
