//! Catalog partitioning rules.
//!
//! Given a full catalog snapshot, products split into two disjoint groups:
//!
//! - *Eligible base products*: simple products with enough stock to be
//!   turned into a bundle, and no bundle machinery attached yet.
//! - *Bundle products*: products carrying the `Bundle` option axis with all
//!   three tier values present.
//!
//! Everything here is a pure function of the snapshot; sales totals are
//! folded in afterwards by the report builder.

use std::collections::BTreeSet;

use crate::bundle::{BUNDLE_OPTION_NAME, BundleTier, conversion_rate, format_price};
use crate::report::{BundleProductReport, BundleTierReport, EligibleProduct};
use crate::snapshot::{ProductSnapshot, VariantSnapshot};

/// Minimum base-variant availability for a product to be worth bundling.
const MIN_ELIGIBLE_AVAILABLE: i64 = 3;

/// The base (un-bundled) variant of a product.
///
/// The first variant with no tier option value, falling back to the first
/// variant when every variant carries a tier value.
#[must_use]
pub fn base_variant(product: &ProductSnapshot) -> Option<&VariantSnapshot> {
    product
        .variants
        .iter()
        .find(|v| !v.is_tier_variant())
        .or_else(|| product.variants.first())
}

/// Whether a product carries the full bundle axis.
///
/// True iff the product has exactly one option named `Bundle`
/// (case-insensitive) and that option's values include all of 1x/2x/3x.
/// Extra values on the axis do not disqualify it.
#[must_use]
pub fn is_bundle_product(product: &ProductSnapshot) -> bool {
    let mut bundle_options = product
        .options
        .iter()
        .filter(|o| o.name.eq_ignore_ascii_case(BUNDLE_OPTION_NAME));

    let Some(option) = bundle_options.next() else {
        return false;
    };
    if bundle_options.next().is_some() {
        return false;
    }

    BundleTier::ALL.iter().all(|tier| {
        option
            .values
            .iter()
            .any(|v| v.trim().eq_ignore_ascii_case(tier.option_value()))
    })
}

/// Whether a product is an eligible base product.
///
/// Requires more than 3 units of base-variant inventory, no tier variants
/// already present, and no option axes other than `Bundle`/`Title`.
#[must_use]
pub fn is_eligible_base(product: &ProductSnapshot) -> bool {
    let available = base_variant(product).map_or(0, |v| v.available);
    if available <= MIN_ELIGIBLE_AVAILABLE {
        return false;
    }
    if product.variants.iter().any(VariantSnapshot::is_tier_variant) {
        return false;
    }
    product.options.iter().all(|o| {
        o.name.eq_ignore_ascii_case(BUNDLE_OPTION_NAME) || o.name.eq_ignore_ascii_case("Title")
    })
}

/// The unique sorted set of tags across the catalog, case-folded and trimmed.
#[must_use]
pub fn unique_tags(products: &[ProductSnapshot]) -> Vec<String> {
    let set: BTreeSet<String> = products
        .iter()
        .flat_map(|p| p.tags.iter())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    set.into_iter().collect()
}

/// Partition a catalog snapshot into eligible and bundle products.
///
/// Eligible products are sorted by title; each bundle product's tier rows
/// are sorted by ascending multiplier with `total_orders` left at zero for
/// the aggregator to fill in.
#[must_use]
pub fn classify(products: &[ProductSnapshot]) -> (Vec<EligibleProduct>, Vec<BundleProductReport>) {
    let mut eligible: Vec<EligibleProduct> = products
        .iter()
        .filter(|p| is_eligible_base(p))
        .filter_map(|p| {
            let base = base_variant(p)?;
            Some(EligibleProduct {
                id: p.id.clone(),
                title: p.title.clone(),
                available: base.available,
                price: format_price(base.price),
            })
        })
        .collect();
    eligible.sort_by(|a, b| a.title.cmp(&b.title));

    let bundles: Vec<BundleProductReport> = products
        .iter()
        .filter(|p| is_bundle_product(p))
        .map(|p| {
            let tiers: Vec<BundleTierReport> = BundleTier::ALL
                .iter()
                .filter_map(|&tier| {
                    let variant = p.variants.iter().find(|v| v.tier() == Some(tier))?;
                    Some(BundleTierReport {
                        tier,
                        variant_id: variant.id.clone(),
                        price: format_price(variant.price),
                        available: variant.available,
                        total_orders: 0,
                    })
                })
                .collect();

            let visitors = p.visitors.unwrap_or(0);
            BundleProductReport {
                id: p.id.clone(),
                title: p.title.clone(),
                tiers,
                visitors,
                units_sold: 0,
                conversion_rate: conversion_rate(0, visitors),
            }
        })
        .collect();

    (eligible, bundles)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::snapshot::OptionSnapshot;
    use rust_decimal_macros::dec;

    fn option(name: &str, values: &[&str]) -> OptionSnapshot {
        OptionSnapshot {
            id: format!("gid://shopify/ProductOption/{name}"),
            name: name.to_string(),
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    fn variant(id: &str, options: &[&str], available: i64) -> VariantSnapshot {
        VariantSnapshot {
            id: format!("gid://shopify/ProductVariant/{id}"),
            sku: Some(format!("SKU-{id}")),
            price: dec!(10.00),
            selected_options: options.iter().map(ToString::to_string).collect(),
            available,
            inventory_item_id: Some(format!("gid://shopify/InventoryItem/{id}")),
        }
    }

    fn product(id: &str, options: Vec<OptionSnapshot>, variants: Vec<VariantSnapshot>) -> ProductSnapshot {
        ProductSnapshot {
            id: format!("gid://shopify/Product/{id}"),
            title: format!("Product {id}"),
            tags: vec![],
            options,
            variants,
            visitors: None,
        }
    }

    fn bundle_product(id: &str) -> ProductSnapshot {
        product(
            id,
            vec![option("Bundle", &["1x", "2x", "3x"])],
            vec![
                variant("1", &["1x"], 37),
                variant("2", &["2x"], 18),
                variant("3", &["3x"], 12),
            ],
        )
    }

    #[test]
    fn test_bundle_product_detected() {
        assert!(is_bundle_product(&bundle_product("b")));
    }

    #[test]
    fn test_bundle_option_order_and_case_irrelevant() {
        let p = product(
            "b",
            vec![option("bundle", &["3X", "1x", "2x", "6x"])],
            vec![],
        );
        assert!(is_bundle_product(&p));
    }

    #[test]
    fn test_missing_tier_value_not_a_bundle() {
        let p = product("b", vec![option("Bundle", &["1x", "2x"])], vec![]);
        assert!(!is_bundle_product(&p));
    }

    #[test]
    fn test_duplicate_bundle_axis_not_a_bundle() {
        let p = product(
            "b",
            vec![
                option("Bundle", &["1x", "2x", "3x"]),
                option("bundle", &["1x", "2x", "3x"]),
            ],
            vec![],
        );
        assert!(!is_bundle_product(&p));
    }

    #[test]
    fn test_eligible_base_product() {
        let p = product(
            "e",
            vec![option("Title", &["Default Title"])],
            vec![variant("1", &["Default Title"], 10)],
        );
        assert!(is_eligible_base(&p));
    }

    #[test]
    fn test_low_stock_not_eligible() {
        let p = product(
            "e",
            vec![option("Title", &["Default Title"])],
            vec![variant("1", &["Default Title"], 3)],
        );
        assert!(!is_eligible_base(&p));
    }

    #[test]
    fn test_foreign_option_axis_not_eligible() {
        // Extra non-Bundle/Title axis excludes the product even with stock.
        let p = product(
            "e",
            vec![
                option("Title", &["Default Title"]),
                option("Size", &["S", "M"]),
            ],
            vec![variant("1", &["Default Title"], 50)],
        );
        assert!(!is_eligible_base(&p));
    }

    #[test]
    fn test_existing_tier_variants_not_eligible() {
        let p = product(
            "e",
            vec![option("Title", &["Default Title"])],
            vec![variant("1", &["Default Title"], 50), variant("2", &["2x"], 5)],
        );
        assert!(!is_eligible_base(&p));
    }

    #[test]
    fn test_base_variant_prefers_non_tier() {
        let p = product(
            "p",
            vec![],
            vec![variant("1", &["2x"], 5), variant("2", &["Default Title"], 9)],
        );
        assert_eq!(
            base_variant(&p).unwrap().id,
            "gid://shopify/ProductVariant/2"
        );
    }

    #[test]
    fn test_base_variant_falls_back_to_first() {
        let p = product("p", vec![], vec![variant("1", &["1x"], 5)]);
        assert_eq!(
            base_variant(&p).unwrap().id,
            "gid://shopify/ProductVariant/1"
        );
    }

    #[test]
    fn test_unique_tags_folded_and_sorted() {
        let mut a = bundle_product("a");
        a.tags = vec!["Summer ".to_string(), "sale".to_string()];
        let mut b = bundle_product("b");
        b.tags = vec!["SALE".to_string(), "new".to_string(), String::new()];

        assert_eq!(unique_tags(&[a, b]), vec!["new", "sale", "summer"]);
    }

    #[test]
    fn test_classify_partitions_and_sorts() {
        let mut simple_z = product(
            "z",
            vec![option("Title", &["Default Title"])],
            vec![variant("z1", &["Default Title"], 20)],
        );
        simple_z.title = "Zebra".to_string();
        let mut simple_a = product(
            "a",
            vec![option("Title", &["Default Title"])],
            vec![variant("a1", &["Default Title"], 8)],
        );
        simple_a.title = "Apple".to_string();

        let (eligible, bundles) = classify(&[simple_z, bundle_product("b"), simple_a]);

        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].title, "Apple");
        assert_eq!(eligible[1].title, "Zebra");

        assert_eq!(bundles.len(), 1);
        let tiers = &bundles[0].tiers;
        assert_eq!(tiers.len(), 3);
        assert_eq!(
            tiers.iter().map(|t| t.tier.multiplier()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(tiers[1].available, 18);
        assert_eq!(tiers[0].price, "10.00");
    }
}
