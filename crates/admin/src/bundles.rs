//! Bundle mutation pipelines and the batch orchestrator.
//!
//! Every pipeline is a per-product state machine built from the typed calls
//! in [`crate::shopify`]. Batches run products in bounded chunks with full
//! concurrency inside a chunk; one product failing never aborts the rest.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use multipack_core::{BundleTier, format_price, tier_price, tier_quantity};

use crate::shopify::types::{VariantNode, product_gid};
use crate::shopify::{InventoryQuantityChange, ShopifyClient, ShopifyError};

/// Products per concurrent chunk.
const CHUNK_SIZE: usize = 15;

/// Pause between chunks. The transport already spaces individual calls; this
/// keeps burst admission pressure on the gate bounded as well.
const INTER_CHUNK_PAUSE: Duration = Duration::from_millis(300);

/// Parameters for creating bundles on a batch of products.
#[derive(Debug, Clone)]
pub struct CreateBundleParams {
    /// Discount percent applied to the 2x tier.
    pub discount_double: Decimal,
    /// Discount percent applied to the 3x tier.
    pub discount_triple: Decimal,
    /// Relink the product's primary image to each new tier variant.
    pub link_images: bool,
    /// Free-text annotation stored as the `bundle.extra_text` metafield.
    pub extra_text: Option<String>,
}

/// Parameters for repricing the 2x/3x tiers of existing bundles.
#[derive(Debug, Clone, Copy)]
pub struct UpdatePricesParams {
    pub discount_double: Decimal,
    pub discount_triple: Decimal,
}

/// One failed product in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub product_id: String,
    pub error: String,
}

/// Aggregated outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Number of products the batch was asked to process.
    pub requested: usize,
    /// Number that completed their pipeline.
    pub succeeded: usize,
    /// Per-product failures, sorted by product id.
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    /// Whether every product in the batch succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run one pipeline over a batch of product ids.
///
/// Ids are processed in chunks of [`CHUNK_SIZE`]; products inside a chunk run
/// concurrently and their outcomes are joined without short-circuiting, so a
/// failure is recorded and the rest of the chunk continues. Chunks run
/// sequentially with [`INTER_CHUNK_PAUSE`] between them.
async fn run_batch<F, Fut>(product_ids: Vec<String>, op: F) -> BatchReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), ShopifyError>>,
{
    let requested = product_ids.len();
    let mut succeeded = 0usize;
    let mut failed: Vec<BatchFailure> = Vec::new();

    for (index, chunk) in product_ids.chunks(CHUNK_SIZE).enumerate() {
        if index > 0 {
            tokio::time::sleep(INTER_CHUNK_PAUSE).await;
        }

        let futures: Vec<_> = chunk.iter().map(|id| op(id.clone())).collect();
        let outcomes = join_all(futures).await;

        for (id, outcome) in chunk.iter().zip(outcomes) {
            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Pipeline failed");
                    failed.push(BatchFailure {
                        product_id: id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    failed.sort_by(|a, b| a.product_id.cmp(&b.product_id));
    BatchReport {
        requested,
        succeeded,
        failed,
    }
}

/// The tier a variant belongs to, read off its selected option values.
fn variant_tier(variant: &VariantNode) -> Option<BundleTier> {
    variant
        .selected_options
        .iter()
        .find_map(|o| BundleTier::parse(&o.value).ok())
}

fn discount_for(tier: BundleTier, params: &CreateBundleParams) -> Decimal {
    match tier {
        BundleTier::Single => Decimal::ZERO,
        BundleTier::Double => params.discount_double,
        BundleTier::Triple => params.discount_triple,
    }
}

/// Turn a batch of simple products into 1x/2x/3x bundles.
#[instrument(skip(client, params), fields(count = product_ids.len()))]
pub async fn create_bundles(
    client: &ShopifyClient,
    product_ids: Vec<String>,
    params: CreateBundleParams,
) -> BatchReport {
    run_batch(product_ids, |id| {
        let client = client.clone();
        let params = params.clone();
        async move { create_one(&client, &id, &params).await }
    })
    .await
}

/// Reprice the 2x/3x tiers of a batch of existing bundles.
#[instrument(skip(client), fields(count = product_ids.len()))]
pub async fn update_bundle_prices(
    client: &ShopifyClient,
    product_ids: Vec<String>,
    params: UpdatePricesParams,
) -> BatchReport {
    run_batch(product_ids, |id| {
        let client = client.clone();
        async move { update_one(&client, &id, params).await }
    })
    .await
}

/// Collapse a batch of bundles back into simple products.
#[instrument(skip(client), fields(count = product_ids.len()))]
pub async fn delete_bundles(client: &ShopifyClient, product_ids: Vec<String>) -> BatchReport {
    run_batch(product_ids, |id| {
        let client = client.clone();
        async move { delete_one(&client, &id).await }
    })
    .await
}

/// Re-derive tier availability from 1x stock for a batch of bundles.
#[instrument(skip(client), fields(count = product_ids.len()))]
pub async fn sync_bundle_inventory(
    client: &ShopifyClient,
    product_ids: Vec<String>,
) -> BatchReport {
    run_batch(product_ids, |id| {
        let client = client.clone();
        async move { sync_one(&client, &id).await }
    })
    .await
}

/// Create pipeline for one product.
///
/// Fetch, annotate, tear down the existing variants, install the Bundle axis,
/// recreate the three tiers from the captured base values, then clear any
/// leftover default variant and optionally relink the primary image.
async fn create_one(
    client: &ShopifyClient,
    product_id: &str,
    params: &CreateBundleParams,
) -> Result<(), ShopifyError> {
    let gid = product_gid(product_id);
    let product = client.fetch_product(&gid).await?;
    let media_id = product.primary_media_id();

    if let Some(text) = params.extra_text.as_deref().filter(|t| !t.trim().is_empty()) {
        client
            .set_metafield(&gid, "extra_text", text, "multi_line_text_field")
            .await?;
    }

    // Base values must be captured before the variants are deleted.
    let base = product
        .variants
        .edges
        .iter()
        .map(|e| &e.node)
        .find(|v| variant_tier(v).is_none())
        .or_else(|| product.variants.edges.first().map(|e| &e.node))
        .ok_or_else(|| ShopifyError::NotFound(format!("Variants on product {product_id}")))?;

    let base_price: Decimal = base.price.parse().map_err(|_| {
        ShopifyError::Parse(format!("Invalid base price for {product_id}: {}", base.price))
    })?;
    let base_available = base.inventory_quantity.unwrap_or(0);
    let location_id = base.location_id().ok_or_else(|| {
        ShopifyError::NotFound(format!("Inventory location for product {product_id}"))
    })?;

    let existing: Vec<String> = product
        .variants
        .edges
        .iter()
        .map(|e| e.node.id.clone())
        .collect();
    client.bulk_delete_variants(&gid, &existing).await?;

    let tier_values: Vec<&str> = BundleTier::ALL.iter().map(|t| t.option_value()).collect();
    client
        .create_product_option(&gid, "Bundle", &tier_values)
        .await?;

    // Re-fetch so the new option and the auto-created default variant are
    // visible before the tiers go in.
    let refetched = client.fetch_product(&gid).await?;

    let variants: Vec<serde_json::Value> = BundleTier::ALL
        .iter()
        .map(|&tier| {
            let price = tier_price(base_price, tier, discount_for(tier, params));
            serde_json::json!({
                "optionValues": [{
                    "optionName": "Bundle",
                    "name": tier.option_value(),
                }],
                "price": format_price(price),
                "inventoryQuantities": [{
                    "locationId": location_id,
                    "availableQuantity": tier_quantity(base_available, tier),
                }],
            })
        })
        .collect();
    let created = client.bulk_create_variants(&gid, variants).await?;

    // The platform backfills a default variant when a product briefly has
    // none; it is not one of ours, so it goes.
    let leftovers: Vec<String> = refetched
        .variants
        .edges
        .iter()
        .map(|e| &e.node)
        .filter(|v| variant_tier(v).is_none())
        .map(|v| v.id.clone())
        .collect();
    if !leftovers.is_empty() {
        client.bulk_delete_variants(&gid, &leftovers).await?;
    }

    if params.link_images
        && let Some(media_id) = media_id
    {
        let created_ids: Vec<String> = created.iter().map(|v| v.id.clone()).collect();
        client
            .append_variant_media(&gid, &media_id, &created_ids)
            .await?;
    }

    tracing::info!(product_id, "Bundle created");
    Ok(())
}

/// Update pipeline for one product: reprice 2x/3x off the current 1x price.
async fn update_one(
    client: &ShopifyClient,
    product_id: &str,
    params: UpdatePricesParams,
) -> Result<(), ShopifyError> {
    let gid = product_gid(product_id);
    let product = client.fetch_product(&gid).await?;

    let find_tier = |tier: BundleTier| {
        product
            .variants
            .edges
            .iter()
            .map(|e| &e.node)
            .find(|v| variant_tier(v) == Some(tier))
    };

    let single = find_tier(BundleTier::Single).ok_or_else(|| {
        ShopifyError::NotFound(format!("1x variant on product {product_id}"))
    })?;
    let double = find_tier(BundleTier::Double);
    let triple = find_tier(BundleTier::Triple);
    if double.is_none() && triple.is_none() {
        return Err(ShopifyError::NotFound(format!(
            "2x/3x variants on product {product_id}"
        )));
    }

    let base_price: Decimal = single.price.parse().map_err(|_| {
        ShopifyError::Parse(format!(
            "Invalid base price for {product_id}: {}",
            single.price
        ))
    })?;

    let mut prices: Vec<(String, String)> = Vec::with_capacity(2);
    if let Some(v) = double {
        let price = tier_price(base_price, BundleTier::Double, params.discount_double);
        prices.push((v.id.clone(), format_price(price)));
    }
    if let Some(v) = triple {
        let price = tier_price(base_price, BundleTier::Triple, params.discount_triple);
        prices.push((v.id.clone(), format_price(price)));
    }

    client.bulk_update_variant_prices(&gid, &prices).await?;
    tracing::info!(product_id, "Bundle prices updated");
    Ok(())
}

/// Delete pipeline for one product: remove every tier variant, drop the
/// Bundle axis so the product collapses back to a simple one, and clean up
/// the metafields this system wrote.
async fn delete_one(client: &ShopifyClient, product_id: &str) -> Result<(), ShopifyError> {
    let gid = product_gid(product_id);
    let product = client.fetch_product(&gid).await?;

    let tier_variant_ids: Vec<String> = product
        .variants
        .edges
        .iter()
        .map(|e| &e.node)
        .filter(|v| variant_tier(v).is_some())
        .map(|v| v.id.clone())
        .collect();
    if !tier_variant_ids.is_empty() {
        client.bulk_delete_variants(&gid, &tier_variant_ids).await?;
    }

    let bundle_option_ids: Vec<String> = product
        .options
        .iter()
        .filter(|o| o.name.eq_ignore_ascii_case("Bundle"))
        .map(|o| o.id.clone())
        .collect();
    if !bundle_option_ids.is_empty() {
        client.delete_product_options(&gid, &bundle_option_ids).await?;
    }

    client
        .delete_metafields(&gid, &["visitors", "extra_text"])
        .await?;

    tracing::info!(product_id, "Bundle deleted");
    Ok(())
}

/// Sync pipeline for one product: re-derive 2x/3x availability from 1x stock
/// and push all tiers in one batched inventory call.
async fn sync_one(client: &ShopifyClient, product_id: &str) -> Result<(), ShopifyError> {
    let gid = product_gid(product_id);
    let product = client.fetch_product(&gid).await?;

    let base_available = product
        .variants
        .edges
        .iter()
        .map(|e| &e.node)
        .find(|v| variant_tier(v) == Some(BundleTier::Single))
        .and_then(|v| v.inventory_quantity)
        .ok_or_else(|| {
            ShopifyError::NotFound(format!("1x variant on product {product_id}"))
        })?;

    let mut changes: Vec<InventoryQuantityChange> = Vec::new();
    for edge in &product.variants.edges {
        let variant = &edge.node;
        let Some(tier) = variant_tier(variant) else {
            continue;
        };
        let Some(item) = variant.inventory_item.as_ref() else {
            continue;
        };
        let Some(location_id) = variant.location_id() else {
            continue;
        };
        changes.push(InventoryQuantityChange {
            inventory_item_id: item.id.clone(),
            location_id,
            quantity: tier_quantity(base_available, tier),
        });
    }

    if changes.is_empty() {
        return Err(ShopifyError::NotFound(format!(
            "Tier variants with tracked inventory on product {product_id}"
        )));
    }

    client.set_inventory_quantities(&changes).await?;
    tracing::info!(product_id, tiers = changes.len(), "Inventory synced");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_run_batch_isolates_failures() {
        let ids: Vec<String> = (1..=4).map(|i| i.to_string()).collect();
        let report = run_batch(ids, |id| async move {
            if id == "2" || id == "4" {
                Err(ShopifyError::NotFound(format!("product {id}")))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(report.requested, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].product_id, "2");
        assert_eq!(report.failed[1].product_id, "4");
        assert!(!report.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_batch_chunks_run_concurrently() {
        // 20 ids -> two chunks of 15 and 5. Everything inside a chunk starts
        // before anything in it finishes.
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let ids: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let report = run_batch(ids, |_| {
            let concurrent = Arc::clone(&concurrent);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(report.succeeded, 20);
        assert_eq!(max_seen.load(Ordering::SeqCst), CHUNK_SIZE);
    }

    #[test]
    fn test_variant_tier_from_selected_options() {
        let variant = VariantNode {
            id: "gid://shopify/ProductVariant/1".to_string(),
            sku: None,
            price: "10.00".to_string(),
            selected_options: vec![crate::shopify::types::SelectedOption {
                name: "Bundle".to_string(),
                value: "2x".to_string(),
            }],
            inventory_quantity: None,
            inventory_item: None,
        };
        assert_eq!(variant_tier(&variant), Some(BundleTier::Double));
    }
}
