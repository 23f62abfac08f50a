//! Order history crawl and SKU-level sales aggregation.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::instrument;

use super::client::ShopifyClient;
use super::types::{Connection, OrderNode};
use super::ShopifyError;

/// Page size for the order crawl (the platform maximum).
const ORDER_PAGE_SIZE: i64 = 250;

/// Cap on order pages per SKU chunk. Order history is unbounded and the
/// report only needs recent sales volume, so the crawl stops here and the
/// aggregate is a floor, not an exact total.
const MAX_ORDER_PAGES: u32 = 10;

/// SKUs per search query. Long OR-chains degrade the platform's search,
/// so lookups go out in chunks.
const SKU_CHUNK_SIZE: usize = 50;

const ORDERS_PAGE_QUERY: &str = r"
    query OrdersPage($first: Int!, $after: String, $query: String) {
        orders(first: $first, after: $after, query: $query) {
            pageInfo { hasNextPage endCursor }
            edges {
                node {
                    id
                    lineItems(first: 100) {
                        edges { node { sku quantity } }
                    }
                }
            }
        }
    }
";

impl ShopifyClient {
    /// Fetch one page of orders matching a search query.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response is malformed.
    #[instrument(skip(self, query))]
    async fn fetch_orders_page(
        &self,
        query: &str,
        after: Option<String>,
    ) -> Result<Connection<OrderNode>, ShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            orders: Connection<OrderNode>,
        }

        let data: Data = self
            .graphql(
                "orders",
                ORDERS_PAGE_QUERY,
                serde_json::json!({
                    "first": ORDER_PAGE_SIZE,
                    "after": after,
                    "query": query,
                }),
            )
            .await?;

        Ok(data.orders)
    }

    /// Total units sold per SKU across the order history.
    ///
    /// SKUs are looked up in chunks; within each chunk the crawl walks order
    /// pages until exhaustion or [`MAX_ORDER_PAGES`], whichever comes first.
    /// Hitting the cap truncates silently (logged) and the totals for that
    /// chunk are partial.
    ///
    /// # Errors
    ///
    /// Propagates the first page fetch failure, tagged with the chunk and
    /// page it occurred on.
    #[instrument(skip(self, skus), fields(sku_count = skus.len()))]
    pub async fn aggregate_sales_by_sku(
        &self,
        skus: &[String],
    ) -> Result<HashMap<String, i64>, ShopifyError> {
        let mut totals: HashMap<String, i64> = HashMap::new();
        if skus.is_empty() {
            return Ok(totals);
        }

        let wanted: HashSet<&str> = skus.iter().map(String::as_str).collect();

        for (chunk_index, chunk) in skus.chunks(SKU_CHUNK_SIZE).enumerate() {
            // Quoted so SKUs containing spaces or colons don't break the
            // OR chain.
            let query = chunk
                .iter()
                .map(|sku| format!("sku:\"{sku}\""))
                .collect::<Vec<_>>()
                .join(" OR ");

            let mut after: Option<String> = None;
            let mut page = 1u32;

            loop {
                let connection = self
                    .fetch_orders_page(&query, after.clone())
                    .await
                    .map_err(|e| {
                        e.at_stage(format!("orders chunk {chunk_index} page {page}"))
                    })?;

                let has_next = connection.page_info.has_next_page;
                after = connection.page_info.end_cursor.clone();

                for order in connection.into_nodes() {
                    for item in order.line_items.into_nodes() {
                        if let Some(sku) = item.sku
                            && wanted.contains(sku.as_str())
                        {
                            *totals.entry(sku).or_insert(0) += item.quantity;
                        }
                    }
                }

                if !has_next {
                    break;
                }
                if page >= MAX_ORDER_PAGES {
                    tracing::warn!(
                        chunk_index,
                        pages = MAX_ORDER_PAGES,
                        "Order crawl hit the page cap, sales totals are partial"
                    );
                    break;
                }
                page += 1;
            }
        }

        Ok(totals)
    }
}
