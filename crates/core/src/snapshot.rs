//! Transient projections of platform catalog state.
//!
//! These are short-lived snapshots built from one API crawl and discarded
//! after a report is rendered or a mutation batch completes. The platform
//! remains the only source of truth.

use rust_decimal::Decimal;

use crate::bundle::BundleTier;

/// A named option axis with its ordered allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSnapshot {
    /// Option identifier (platform GID).
    pub id: String,
    /// Axis name, e.g. "Bundle" or "Title".
    pub name: String,
    /// Allowed values in platform order.
    pub values: Vec<String>,
}

/// A product variant as seen in one catalog crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSnapshot {
    /// Variant identifier (platform GID). Reassigned when tiers are recreated.
    pub id: String,
    /// Stock-keeping unit. The stable key for sales aggregation.
    pub sku: Option<String>,
    /// Current price.
    pub price: Decimal,
    /// Selected option values, e.g. `["2x"]`.
    pub selected_options: Vec<String>,
    /// Available quantity at the tracked location.
    pub available: i64,
    /// Linked inventory item identifier.
    pub inventory_item_id: Option<String>,
}

impl VariantSnapshot {
    /// The tier this variant represents, if any of its option values names one.
    #[must_use]
    pub fn tier(&self) -> Option<BundleTier> {
        self.selected_options
            .iter()
            .find_map(|v| BundleTier::parse(v).ok())
    }

    /// Whether this is a bundle-tier variant.
    #[must_use]
    pub fn is_tier_variant(&self) -> bool {
        self.tier().is_some()
    }
}

/// A product as seen in one catalog crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    /// Product identifier (platform GID).
    pub id: String,
    /// Product title.
    pub title: String,
    /// Product tags as stored on the platform.
    pub tags: Vec<String>,
    /// Option axes.
    pub options: Vec<OptionSnapshot>,
    /// Variants in platform order.
    pub variants: Vec<VariantSnapshot>,
    /// Visitor count from the `bundle.visitors` metafield, if present.
    pub visitors: Option<i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn variant(options: &[&str]) -> VariantSnapshot {
        VariantSnapshot {
            id: "gid://shopify/ProductVariant/1".to_string(),
            sku: Some("SKU-1".to_string()),
            price: dec!(10.00),
            selected_options: options.iter().map(ToString::to_string).collect(),
            available: 5,
            inventory_item_id: None,
        }
    }

    #[test]
    fn test_variant_tier_detection() {
        assert_eq!(variant(&["2x"]).tier(), Some(BundleTier::Double));
        assert_eq!(variant(&["Default Title"]).tier(), None);
        assert!(variant(&["3x"]).is_tier_variant());
        assert!(!variant(&[]).is_tier_variant());
    }

    #[test]
    fn test_variant_tier_among_other_values() {
        // A tier value anywhere in the selected options qualifies.
        assert_eq!(variant(&["Red", "1x"]).tier(), Some(BundleTier::Single));
    }
}
