//! Per-product visitor counter, persisted as the `bundle.visitors` metafield.
//!
//! The counter is a read-increment-write over platform metadata, so two
//! concurrent visits can race and drop an increment. Visit counts feed a
//! rough conversion metric; losing the odd increment is acceptable and not
//! worth a coordination layer.

use serde_json::json;
use tracing::instrument;

use crate::shopify::types::numeric_id;
use crate::shopify::{RestMethod, ShopifyClient, ShopifyError};

const NAMESPACE: &str = "bundle";
const KEY: &str = "visitors";

/// Increment the visitor count for a product and return the new value.
///
/// # Errors
///
/// Fails if the metafield read or write fails; retry policy is the
/// transport's.
#[instrument(skip(client), fields(product_id = %product_id))]
pub async fn record_visit(
    client: &ShopifyClient,
    product_id: &str,
) -> Result<i64, ShopifyError> {
    let id = numeric_id(product_id);
    let path = format!("products/{id}/metafields.json");

    let response = client.rest(RestMethod::Get, &path, None).await?;
    let existing = response
        .get("metafields")
        .and_then(|m| m.as_array())
        .and_then(|metafields| {
            metafields.iter().find(|m| {
                m.get("namespace").and_then(|v| v.as_str()) == Some(NAMESPACE)
                    && m.get("key").and_then(|v| v.as_str()) == Some(KEY)
            })
        })
        .cloned();

    match existing {
        Some(metafield) => {
            let metafield_id = metafield
                .get("id")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| {
                    ShopifyError::Parse(format!("Metafield without id on product {id}"))
                })?;
            let current = metafield
                .get("value")
                .map_or(0, |v| match v {
                    serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
                    serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
                    _ => 0,
                });
            let next = current + 1;

            client
                .rest(
                    RestMethod::Put,
                    &format!("metafields/{metafield_id}.json"),
                    Some(&json!({
                        "metafield": {
                            "id": metafield_id,
                            "value": next.to_string(),
                            "type": "number_integer",
                        },
                    })),
                )
                .await?;
            Ok(next)
        }
        None => {
            client
                .rest(
                    RestMethod::Post,
                    &path,
                    Some(&json!({
                        "metafield": {
                            "namespace": NAMESPACE,
                            "key": KEY,
                            "value": "1",
                            "type": "number_integer",
                        },
                    })),
                )
                .await?;
            Ok(1)
        }
    }
}
