//! Serializable report types returned by the read endpoint.
//!
//! Prices cross the wire as 2-decimal strings, matching what the platform
//! expects back on write.

use serde::Serialize;

use crate::bundle::BundleTier;

/// A product that could be turned into a bundle but is not one yet.
#[derive(Debug, Clone, Serialize)]
pub struct EligibleProduct {
    /// Product identifier.
    pub id: String,
    /// Product title.
    pub title: String,
    /// Base-variant availability.
    pub available: i64,
    /// Base-variant price as a 2-decimal string.
    pub price: String,
}

/// One tier row of a bundle product.
#[derive(Debug, Clone, Serialize)]
pub struct BundleTierReport {
    /// The tier (serialized as its multiplier).
    pub tier: BundleTier,
    /// Current variant identifier for the tier.
    pub variant_id: String,
    /// Tier price as a 2-decimal string.
    pub price: String,
    /// Available quantity.
    pub available: i64,
    /// Cumulative units sold, aggregated by SKU.
    pub total_orders: i64,
}

/// A product already carrying the full 1x/2x/3x bundle axis.
#[derive(Debug, Clone, Serialize)]
pub struct BundleProductReport {
    /// Product identifier.
    pub id: String,
    /// Product title.
    pub title: String,
    /// Tier rows, sorted by ascending multiplier.
    pub tiers: Vec<BundleTierReport>,
    /// Visitor count from the `bundle.visitors` metafield.
    pub visitors: i64,
    /// Total units sold across all tiers.
    pub units_sold: i64,
    /// Visitor-to-purchase conversion in percent (0 when no visitors).
    pub conversion_rate: f64,
}

/// The aggregated catalog report.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    /// Products eligible to become bundles, sorted by title.
    pub eligible: Vec<EligibleProduct>,
    /// Bundle products with per-tier analytics.
    pub bundles: Vec<BundleProductReport>,
    /// Unique case-folded tags across the whole catalog, sorted.
    pub tags: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_serializes_as_multiplier() {
        let row = BundleTierReport {
            tier: BundleTier::Double,
            variant_id: "gid://shopify/ProductVariant/2".to_string(),
            price: "18.00".to_string(),
            available: 18,
            total_orders: 4,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["tier"], 2);
        assert_eq!(json["price"], "18.00");
    }
}
