//! Bundle report and mutation endpoints.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Deserialize;

use multipack_core::CatalogReport;

use crate::bundles::{
    BatchReport, CreateBundleParams, UpdatePricesParams, create_bundles, delete_bundles,
    sync_bundle_inventory, update_bundle_prices,
};
use crate::error::AppError;
use crate::report::build_catalog_report;
use crate::state::AppState;

/// Body for `POST /api/bundles`.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub product_ids: Vec<String>,
    pub discount_double: Decimal,
    pub discount_triple: Decimal,
    #[serde(default)]
    pub link_images: bool,
    #[serde(default)]
    pub extra_text: Option<String>,
}

/// Body for `POST /api/bundles/prices`.
#[derive(Debug, Deserialize)]
pub struct UpdatePricesRequest {
    pub product_ids: Vec<String>,
    pub discount_double: Decimal,
    pub discount_triple: Decimal,
}

/// Body for the delete and sync endpoints.
#[derive(Debug, Deserialize)]
pub struct ProductIdsRequest {
    pub product_ids: Vec<String>,
}

fn require_ids(ids: &[String]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("No product ids supplied".to_string()));
    }
    Ok(())
}

/// `GET /api/bundles` - the aggregated catalog report.
pub async fn report(State(state): State<AppState>) -> Result<Json<CatalogReport>, AppError> {
    let report = build_catalog_report(state.shopify()).await?;
    Ok(Json(report))
}

/// `POST /api/bundles` - create bundles on a batch of products.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> Result<Json<BatchReport>, AppError> {
    require_ids(&body.product_ids)?;
    let params = CreateBundleParams {
        discount_double: body.discount_double,
        discount_triple: body.discount_triple,
        link_images: body.link_images,
        extra_text: body.extra_text,
    };
    let report = create_bundles(state.shopify(), body.product_ids, params).await;
    Ok(Json(report))
}

/// `POST /api/bundles/prices` - reprice the 2x/3x tiers.
pub async fn update_prices(
    State(state): State<AppState>,
    Json(body): Json<UpdatePricesRequest>,
) -> Result<Json<BatchReport>, AppError> {
    require_ids(&body.product_ids)?;
    let params = UpdatePricesParams {
        discount_double: body.discount_double,
        discount_triple: body.discount_triple,
    };
    let report = update_bundle_prices(state.shopify(), body.product_ids, params).await;
    Ok(Json(report))
}

/// `POST /api/bundles/delete` - collapse bundles back to simple products.
pub async fn delete(
    State(state): State<AppState>,
    Json(body): Json<ProductIdsRequest>,
) -> Result<Json<BatchReport>, AppError> {
    require_ids(&body.product_ids)?;
    let report = delete_bundles(state.shopify(), body.product_ids).await;
    Ok(Json(report))
}

/// `POST /api/bundles/sync` - re-derive tier inventory from 1x stock.
pub async fn sync(
    State(state): State<AppState>,
    Json(body): Json<ProductIdsRequest>,
) -> Result<Json<BatchReport>, AppError> {
    require_ids(&body.product_ids)?;
    let report = sync_bundle_inventory(state.shopify(), body.product_ids).await;
    Ok(Json(report))
}
