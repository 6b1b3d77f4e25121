//! Movie booking tool service (MCP server side).
//!
//! Exposes `list_movies`, `get_showtimes`, `book_ticket` and a `ping` health
//! check over the MCP protocol. Domain failures (unknown movie/show, bad or
//! oversized seat counts) come back as in-band tool errors with a JSON
//! `{"error": ...}` body; they never tear the service down.

pub mod store;

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use serde_json::json;

use store::{MovieStore, StoreError};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMoviesRequest {
    /// City to filter by, e.g. "Delhi" (case-insensitive). Omit for all locations.
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetShowtimesRequest {
    /// Movie name, e.g. "Inception" (case-insensitive).
    pub movie_name: String,
    /// City to restrict results to (case-insensitive).
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BookTicketRequest {
    /// Show identifier, e.g. "show001" (case-insensitive).
    pub show_id: String,
    /// Number of seats to book; must be greater than 0.
    pub seats: i64,
    /// Optional caller identifier, echoed through unchanged.
    pub user_id: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<MovieStore>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BookingService {
    pub fn new(store: MovieStore) -> Self {
        Self {
            store: Arc::new(store),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all movies available in a given location")]
    async fn list_movies(
        &self,
        Parameters(req): Parameters<ListMoviesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let movies = self.store.list_movies(req.location.as_deref());
        json_success(json!({ "movies": movies }))
    }

    #[tool(description = "Get all showtimes for a movie, optionally in a given location")]
    async fn get_showtimes(
        &self,
        Parameters(req): Parameters<GetShowtimesRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .store
            .showtimes_for(&req.movie_name, req.location.as_deref())
        {
            Ok(res) => json_success(json!({
                "movie": res.movie,
                "showtimes": res.showtimes,
            })),
            Err(e) => Ok(domain_error(&e)),
        }
    }

    #[tool(description = "Book a number of seats for a show id")]
    async fn book_ticket(
        &self,
        Parameters(req): Parameters<BookTicketRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.store.book(&req.show_id, req.seats) {
            Ok(receipt) => json_success(json!({
                "success": receipt.success,
                "message": receipt.message,
                "remaining": receipt.remaining,
            })),
            Err(e) => Ok(domain_error(&e)),
        }
    }

    #[tool(description = "Health check; returns {\"status\": \"ok\"}")]
    async fn ping(&self) -> Result<CallToolResult, McpError> {
        json_success(json!({ "status": "ok" }))
    }
}

#[tool_handler]
impl ServerHandler for BookingService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Movie booking demo server. Use list_movies to browse by city, \
                 get_showtimes for a movie's shows, and book_ticket to reserve seats."
                    .into(),
            ),
            ..Default::default()
        }
    }
}

fn json_success(payload: serde_json::Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string(&payload)
        .map_err(|e| McpError::internal_error(format!("serialize result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// In-band tool error carrying a machine-readable kind plus the message.
fn domain_error(err: &StoreError) -> CallToolResult {
    let body = json!({ "error": { "kind": err.kind(), "message": err.to_string() } });
    CallToolResult::error(vec![Content::text(body.to_string())])
}
