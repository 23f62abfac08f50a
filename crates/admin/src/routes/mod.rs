//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Health check
//!
//! # Bundles
//! GET  /api/bundles               - Aggregated catalog report
//! POST /api/bundles               - Create bundles on a batch of products
//! POST /api/bundles/prices        - Reprice 2x/3x tiers
//! POST /api/bundles/delete        - Collapse bundles back to simple products
//! POST /api/bundles/sync          - Re-derive tier inventory from 1x stock
//!
//! # Visits
//! POST /api/products/{id}/visit   - Increment the product's visitor counter
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod bundles;
pub mod visits;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/bundles",
            get(bundles::report).post(bundles::create),
        )
        .route("/api/bundles/prices", post(bundles::update_prices))
        .route("/api/bundles/delete", post(bundles::delete))
        .route("/api/bundles/sync", post(bundles::sync))
        .route("/api/products/{id}/visit", post(visits::record))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
