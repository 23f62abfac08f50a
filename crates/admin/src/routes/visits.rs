//! Visit-tracking endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::visits::record_visit;

/// Response for `POST /api/products/{id}/visit`.
#[derive(Debug, Serialize)]
pub struct VisitResponse {
    pub product_id: String,
    pub visitors: i64,
}

/// `POST /api/products/{id}/visit` - increment the product's visitor counter.
pub async fn record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VisitResponse>, AppError> {
    let visitors = record_visit(state.shopify(), &id).await?;
    Ok(Json(VisitResponse {
        product_id: id,
        visitors,
    }))
}
