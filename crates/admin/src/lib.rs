//! Multipack admin backend library.
//!
//! Exposes the bundle management functionality as a library so the HTTP
//! surface can be exercised from integration tests.
//!
//! # Security
//!
//! This crate holds a HIGH PRIVILEGE Shopify Admin API token with full
//! product, inventory and order access. Deploy behind a trusted network
//! boundary only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bundles;
pub mod config;
pub mod error;
pub mod report;
pub mod routes;
pub mod shopify;
pub mod state;
pub mod visits;
