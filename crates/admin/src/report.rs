//! Catalog report assembly.
//!
//! Pulls the full catalog, partitions it with the pure classification rules
//! in `multipack-core`, then folds SKU-level sales totals from the order
//! history into the bundle rows.

use std::collections::HashMap;

use tracing::instrument;

use multipack_core::{CatalogReport, ProductSnapshot, classify, conversion_rate, unique_tags};

use crate::shopify::{ShopifyClient, ShopifyError};

/// Build the full catalog report.
///
/// # Errors
///
/// Fails fast on the first catalog page or order page that errors out, with
/// the stage attached for diagnosis.
#[instrument(skip(client))]
pub async fn build_catalog_report(client: &ShopifyClient) -> Result<CatalogReport, ShopifyError> {
    let products = client.fetch_all_products().await?;

    let snapshots: Vec<ProductSnapshot> = products
        .into_iter()
        .map(crate::shopify::types::ProductNode::into_snapshot)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.at_stage("catalog snapshot"))?;

    let tags = unique_tags(&snapshots);
    let (eligible, mut bundles) = classify(&snapshots);

    // SKU lookup for the tier variants the aggregator will be asked about.
    let sku_by_variant: HashMap<&str, &str> = snapshots
        .iter()
        .flat_map(|p| p.variants.iter())
        .filter_map(|v| v.sku.as_deref().map(|sku| (v.id.as_str(), sku)))
        .collect();

    let tier_skus: Vec<String> = bundles
        .iter()
        .flat_map(|b| b.tiers.iter())
        .filter_map(|t| sku_by_variant.get(t.variant_id.as_str()))
        .map(ToString::to_string)
        .collect();

    let sales = client.aggregate_sales_by_sku(&tier_skus).await?;

    for bundle in &mut bundles {
        let mut units_sold = 0i64;
        for tier in &mut bundle.tiers {
            let sold = sku_by_variant
                .get(tier.variant_id.as_str())
                .and_then(|sku| sales.get(*sku))
                .copied()
                .unwrap_or(0);
            tier.total_orders = sold;
            units_sold += sold;
        }
        bundle.units_sold = units_sold;
        bundle.conversion_rate = conversion_rate(units_sold, bundle.visitors);
    }

    tracing::info!(
        eligible = eligible.len(),
        bundles = bundles.len(),
        tags = tags.len(),
        "Catalog report built"
    );

    Ok(CatalogReport {
        eligible,
        bundles,
        tags,
    })
}
