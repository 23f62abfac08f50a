//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AdminConfig;
use crate::shopify::ShopifyClient;

/// Application state shared across all handlers.
///
/// Holds only the Shopify client; configuration is consumed at startup and
/// not carried past it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    shopify: ShopifyClient,
}

impl AppState {
    #[must_use]
    pub fn new(config: &AdminConfig) -> Self {
        Self::with_client(ShopifyClient::new(&config.shopify))
    }

    /// Build state around an existing client. Used by tests to inject a
    /// client pointed at a mock server.
    #[must_use]
    pub fn with_client(shopify: ShopifyClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner { shopify }),
        }
    }

    #[must_use]
    pub fn shopify(&self) -> &ShopifyClient {
        &self.inner.shopify
    }
}
