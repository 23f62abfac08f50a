//! Wire types for the Shopify Admin API and conversions into core snapshots.

use rust_decimal::Decimal;
use serde::Deserialize;

use multipack_core::{OptionSnapshot, ProductSnapshot, VariantSnapshot};

use super::ShopifyError;

/// Cursor-based pagination info.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// A connection edge.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

/// A paginated connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Unwrap the edges into plain nodes.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

/// A connection without pagination info (nested lists fetched whole).
#[derive(Debug, Clone, Deserialize)]
pub struct NodeList<T> {
    pub edges: Vec<Edge<T>>,
}

impl<T> NodeList<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

/// A product option axis.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionNode {
    pub id: String,
    pub name: String,
    pub values: Vec<String>,
}

/// A variant's selected option value.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// Reference to an inventory item, with its tracked level when requested.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemNode {
    pub id: String,
    #[serde(default)]
    pub inventory_levels: Option<NodeList<InventoryLevelNode>>,
}

/// An inventory level at a location.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevelNode {
    pub location: LocationRef,
}

/// Reference to a location.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationRef {
    pub id: String,
}

/// A product variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    pub sku: Option<String>,
    pub price: String,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    pub inventory_quantity: Option<i64>,
    pub inventory_item: Option<InventoryItemNode>,
}

impl VariantNode {
    /// The location id of the variant's first tracked inventory level.
    #[must_use]
    pub fn location_id(&self) -> Option<String> {
        self.inventory_item
            .as_ref()?
            .inventory_levels
            .as_ref()?
            .edges
            .first()
            .map(|e| e.node.location.id.clone())
    }

    /// Convert into a core snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Parse` if the price string is not a decimal.
    pub fn into_snapshot(self) -> Result<VariantSnapshot, ShopifyError> {
        let price: Decimal = self.price.parse().map_err(|_| {
            ShopifyError::Parse(format!("Invalid price for variant {}: {}", self.id, self.price))
        })?;

        Ok(VariantSnapshot {
            id: self.id,
            sku: self.sku.filter(|s| !s.is_empty()),
            price,
            selected_options: self.selected_options.into_iter().map(|o| o.value).collect(),
            available: self.inventory_quantity.unwrap_or(0),
            inventory_item_id: self.inventory_item.map(|i| i.id),
        })
    }
}

/// A metafield's value.
#[derive(Debug, Clone, Deserialize)]
pub struct MetafieldValue {
    pub value: String,
}

/// Reference to a piece of product media.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaRef {
    pub id: String,
}

/// A product with its variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub options: Vec<OptionNode>,
    pub variants: NodeList<VariantNode>,
    #[serde(default)]
    pub visitors: Option<MetafieldValue>,
    #[serde(default)]
    pub media: Option<NodeList<MediaRef>>,
}

impl ProductNode {
    /// The product's primary media id, if it has any media.
    #[must_use]
    pub fn primary_media_id(&self) -> Option<String> {
        self.media
            .as_ref()?
            .edges
            .first()
            .map(|e| e.node.id.clone())
    }

    /// Convert into a core snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Parse` if any variant price fails to parse.
    pub fn into_snapshot(self) -> Result<ProductSnapshot, ShopifyError> {
        let visitors = self
            .visitors
            .as_ref()
            .and_then(|m| m.value.trim().parse::<i64>().ok());

        let variants = self
            .variants
            .into_nodes()
            .into_iter()
            .map(VariantNode::into_snapshot)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductSnapshot {
            id: self.id,
            title: self.title,
            tags: self.tags,
            options: self
                .options
                .into_iter()
                .map(|o| OptionSnapshot {
                    id: o.id,
                    name: o.name,
                    values: o.values,
                })
                .collect(),
            variants,
            visitors,
        })
    }
}

/// An order with the line items needed for sales aggregation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNode {
    pub id: String,
    pub line_items: NodeList<LineItemNode>,
}

/// A line item referencing a variant by SKU.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemNode {
    pub sku: Option<String>,
    pub quantity: i64,
}

/// A `userErrors` entry on a mutation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UserErrorNode {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Fail with `ShopifyError::UserError` when a mutation payload carries user
/// errors. The platform rejected the input; this is never retried.
pub fn check_user_errors(errors: &[UserErrorNode]) -> Result<(), ShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            format!("{}: {}", field, e.message)
        })
        .collect();
    Err(ShopifyError::UserError(messages.join("; ")))
}

/// Extract the trailing numeric id from a GID like `gid://shopify/Product/42`.
#[must_use]
pub fn numeric_id(gid: &str) -> &str {
    gid.rsplit('/').next().unwrap_or(gid)
}

/// Build a product GID from a bare numeric id; passes full GIDs through.
#[must_use]
pub fn product_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("gid://shopify/Product/{id}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("gid://shopify/Product/42"), "42");
        assert_eq!(numeric_id("42"), "42");
    }

    #[test]
    fn test_product_gid_roundtrip() {
        assert_eq!(product_gid("42"), "gid://shopify/Product/42");
        assert_eq!(
            product_gid("gid://shopify/Product/42"),
            "gid://shopify/Product/42"
        );
    }

    #[test]
    fn test_check_user_errors_formats_fields() {
        let errors = vec![UserErrorNode {
            field: Some(vec!["variants".to_string(), "price".to_string()]),
            message: "Price must be positive".to_string(),
        }];
        let err = check_user_errors(&errors).unwrap_err();
        assert_eq!(
            err.to_string(),
            "User error: variants.price: Price must be positive"
        );
        assert!(check_user_errors(&[]).is_ok());
    }

    #[test]
    fn test_product_node_into_snapshot() {
        let json = serde_json::json!({
            "id": "gid://shopify/Product/1",
            "title": "Coffee",
            "tags": ["Drinks"],
            "options": [
                {"id": "gid://shopify/ProductOption/1", "name": "Bundle", "values": ["1x", "2x", "3x"]}
            ],
            "variants": {"edges": [
                {"node": {
                    "id": "gid://shopify/ProductVariant/1",
                    "sku": "COF-1",
                    "price": "10.00",
                    "selectedOptions": [{"name": "Bundle", "value": "1x"}],
                    "inventoryQuantity": 37,
                    "inventoryItem": {"id": "gid://shopify/InventoryItem/1"}
                }}
            ]},
            "visitors": {"value": "120"}
        });

        let node: ProductNode = serde_json::from_value(json).unwrap();
        let snapshot = node.into_snapshot().unwrap();

        assert_eq!(snapshot.title, "Coffee");
        assert_eq!(snapshot.visitors, Some(120));
        assert_eq!(snapshot.variants.len(), 1);
        assert_eq!(snapshot.variants[0].available, 37);
        assert_eq!(snapshot.variants[0].selected_options, vec!["1x"]);
    }

    #[test]
    fn test_bad_price_is_a_parse_error() {
        let node = VariantNode {
            id: "gid://shopify/ProductVariant/9".to_string(),
            sku: None,
            price: "not-a-price".to_string(),
            selected_options: vec![],
            inventory_quantity: None,
            inventory_item: None,
        };
        assert!(matches!(
            node.into_snapshot(),
            Err(ShopifyError::Parse(_))
        ));
    }
}
