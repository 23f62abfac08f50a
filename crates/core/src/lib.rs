//! Multipack Core - Shared bundle domain logic.
//!
//! This crate holds the pure rules of the bundle system, used by the
//! `admin` backend:
//!
//! - [`bundle`] - Tier definitions plus the pricing and inventory arithmetic
//! - [`snapshot`] - Transient projections of platform products and variants
//! - [`classify`] - Catalog partitioning into eligible and bundle products
//! - [`report`] - Serializable report types returned by the read endpoint
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here is a function of in-memory snapshots; all durable
//! state lives in Shopify.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bundle;
pub mod classify;
pub mod report;
pub mod snapshot;

pub use bundle::{BundleTier, conversion_rate, format_price, tier_price, tier_quantity};
pub use classify::{base_variant, classify, is_bundle_product, is_eligible_base, unique_tags};
pub use report::{BundleProductReport, BundleTierReport, CatalogReport, EligibleProduct};
pub use snapshot::{OptionSnapshot, ProductSnapshot, VariantSnapshot};
