//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Architecture
//!
//! - Raw GraphQL documents with typed serde responses (no local catalog sync)
//! - Every outbound call - REST and GraphQL alike - travels through the
//!   [`gate::ApiGate`] (global 500 ms spacing, one call in flight) and the
//!   retry wrapper in [`client::ShopifyClient`]
//! - Mutations check `userErrors` explicitly; a 200 response alone does not
//!   imply success
//!
//! # Example
//!
//! ```rust,ignore
//! use multipack_admin::shopify::ShopifyClient;
//!
//! let client = ShopifyClient::new(&config.shopify);
//!
//! // Crawl the full catalog
//! let products = client.fetch_all_products().await?;
//!
//! // Set inventory for a tier variant
//! client.set_inventory_quantities(&changes).await?;
//! ```

mod client;
mod gate;
mod orders;
mod products;
pub mod types;

pub use client::{RestMethod, ShopifyClient};
pub use gate::ApiGate;
pub use products::InventoryQuantityChange;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status with the response body for diagnosis.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Rate limited by Shopify (HTTP 429).
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// GraphQL-level throttling signal inside a 200 response.
    #[error("Throttled by GraphQL cost limits")]
    Throttled,

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// Mutation rejected by the platform via `userErrors`.
    #[error("User error: {0}")]
    UserError(String),

    /// Response missing the expected payload envelope.
    #[error("Unexpected response shape: {0}")]
    Parse(String),

    /// JSON decoding failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Retry budget exhausted; carries the last rate-limit signal seen.
    #[error("Max retries exceeded for {operation}")]
    MaxRetries {
        operation: String,
        #[source]
        source: Box<ShopifyError>,
    },

    /// A multi-call pipeline failed partway; names the stage for diagnosis.
    #[error("{stage} failed: {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<ShopifyError>,
    },
}

impl ShopifyError {
    /// Wrap this error with the pipeline stage it occurred in.
    #[must_use]
    pub fn at_stage(self, stage: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            source: Box::new(self),
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Error code from the `extensions` object, e.g. `THROTTLED`.
    pub code: Option<String>,
}

impl GraphQLError {
    /// Whether this error is the platform's throttling signal.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.code.as_deref() == Some("THROTTLED")
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
