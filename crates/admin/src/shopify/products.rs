//! Product, variant, metafield and inventory operations.

use serde::Deserialize;
use tracing::instrument;

use super::client::ShopifyClient;
use super::types::{
    Connection, ProductNode, UserErrorNode, VariantNode, check_user_errors,
};
use super::ShopifyError;

/// Page size for catalog crawls (the platform maximum).
pub const CATALOG_PAGE_SIZE: i64 = 250;

/// Metafield namespace owned by this system.
pub const METAFIELD_NAMESPACE: &str = "bundle";

const PRODUCTS_PAGE_QUERY: &str = r#"
    query ProductsPage($first: Int!, $after: String) {
        products(first: $first, after: $after) {
            pageInfo { hasNextPage endCursor }
            edges {
                node {
                    id
                    title
                    tags
                    options { id name values }
                    variants(first: 100) {
                        edges {
                            node {
                                id
                                sku
                                price
                                selectedOptions { name value }
                                inventoryQuantity
                                inventoryItem { id }
                            }
                        }
                    }
                    visitors: metafield(namespace: "bundle", key: "visitors") { value }
                }
            }
        }
    }
"#;

const PRODUCT_QUERY: &str = r#"
    query Product($id: ID!) {
        product(id: $id) {
            id
            title
            tags
            options { id name values }
            variants(first: 100) {
                edges {
                    node {
                        id
                        sku
                        price
                        selectedOptions { name value }
                        inventoryQuantity
                        inventoryItem {
                            id
                            inventoryLevels(first: 1) {
                                edges { node { location { id } } }
                            }
                        }
                    }
                }
            }
            media(first: 1) { edges { node { id } } }
            visitors: metafield(namespace: "bundle", key: "visitors") { value }
        }
    }
"#;

const PRODUCT_OPTIONS_CREATE: &str = r"
    mutation ProductOptionsCreate($productId: ID!, $options: [OptionCreateInput!]!) {
        productOptionsCreate(productId: $productId, options: $options) {
            userErrors { field message }
        }
    }
";

const PRODUCT_OPTIONS_DELETE: &str = r"
    mutation ProductOptionsDelete($productId: ID!, $options: [ID!]!) {
        productOptionsDelete(productId: $productId, options: $options, strategy: POSITION) {
            userErrors { field message }
        }
    }
";

const VARIANTS_BULK_CREATE: &str = r"
    mutation VariantsBulkCreate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
        productVariantsBulkCreate(productId: $productId, variants: $variants) {
            productVariants {
                id
                sku
                price
                selectedOptions { name value }
                inventoryQuantity
                inventoryItem { id }
            }
            userErrors { field message }
        }
    }
";

const VARIANTS_BULK_UPDATE: &str = r"
    mutation VariantsBulkUpdate($productId: ID!, $variants: [ProductVariantsBulkInput!]!) {
        productVariantsBulkUpdate(productId: $productId, variants: $variants) {
            userErrors { field message }
        }
    }
";

const VARIANTS_BULK_DELETE: &str = r"
    mutation VariantsBulkDelete($productId: ID!, $variantsIds: [ID!]!) {
        productVariantsBulkDelete(productId: $productId, variantsIds: $variantsIds) {
            userErrors { field message }
        }
    }
";

const METAFIELDS_SET: &str = r"
    mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
        metafieldsSet(metafields: $metafields) {
            userErrors { field message }
        }
    }
";

const METAFIELDS_DELETE: &str = r"
    mutation MetafieldsDelete($metafields: [MetafieldIdentifierInput!]!) {
        metafieldsDelete(metafields: $metafields) {
            userErrors { field message }
        }
    }
";

const VARIANT_APPEND_MEDIA: &str = r"
    mutation VariantAppendMedia($productId: ID!, $variantMedia: [ProductVariantAppendMediaInput!]!) {
        productVariantAppendMedia(productId: $productId, variantMedia: $variantMedia) {
            userErrors { field message }
        }
    }
";

const INVENTORY_SET_QUANTITIES: &str = r"
    mutation InventorySetQuantities($input: InventorySetQuantitiesInput!) {
        inventorySetQuantities(input: $input) {
            userErrors { field message }
        }
    }
";

/// Generic mutation payload carrying only `userErrors`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserErrorsPayload {
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

/// An absolute inventory quantity to push for one item at one location.
#[derive(Debug, Clone)]
pub struct InventoryQuantityChange {
    pub inventory_item_id: String,
    pub location_id: String,
    pub quantity: i64,
}

impl ShopifyClient {
    /// Fetch one page of the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the response is malformed.
    #[instrument(skip(self))]
    pub async fn fetch_products_page(
        &self,
        first: i64,
        after: Option<String>,
    ) -> Result<Connection<ProductNode>, ShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            products: Connection<ProductNode>,
        }

        let data: Data = self
            .graphql(
                "products",
                PRODUCTS_PAGE_QUERY,
                serde_json::json!({ "first": first, "after": after }),
            )
            .await?;

        Ok(data.products)
    }

    /// Crawl the entire product catalog in cursor order.
    ///
    /// Pages are fetched strictly sequentially; an empty catalog yields an
    /// empty vec. A failed page fails the whole crawl (its own retry budget
    /// already spent) with the page number attached.
    ///
    /// # Errors
    ///
    /// Propagates the first page fetch failure, tagged with the stage.
    #[instrument(skip(self))]
    pub async fn fetch_all_products(&self) -> Result<Vec<ProductNode>, ShopifyError> {
        let mut products = Vec::new();
        let mut after: Option<String> = None;
        let mut page = 1u32;

        loop {
            let connection = self
                .fetch_products_page(CATALOG_PAGE_SIZE, after.clone())
                .await
                .map_err(|e| e.at_stage(format!("catalog page {page}")))?;

            let has_next = connection.page_info.has_next_page;
            after = connection.page_info.end_cursor.clone();
            products.extend(connection.into_nodes());

            if !has_next {
                break;
            }
            page += 1;
        }

        tracing::debug!(count = products.len(), pages = page, "Catalog crawl complete");
        Ok(products)
    }

    /// Fetch a single product with variants, inventory locations and media.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &str) -> Result<ProductNode, ShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            product: Option<ProductNode>,
        }

        let data: Data = self
            .graphql("product", PRODUCT_QUERY, serde_json::json!({ "id": id }))
            .await?;

        data.product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product {id}")))
    }

    /// Create an option axis on a product.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, values), fields(product_id = %product_id, option = %name))]
    pub async fn create_product_option(
        &self,
        product_id: &str,
        name: &str,
        values: &[&str],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_options_create: Option<UserErrorsPayload>,
        }

        let option_values: Vec<serde_json::Value> = values
            .iter()
            .map(|v| serde_json::json!({ "name": v }))
            .collect();

        let data: Data = self
            .graphql(
                "productOptionsCreate",
                PRODUCT_OPTIONS_CREATE,
                serde_json::json!({
                    "productId": product_id,
                    "options": [{ "name": name, "values": option_values }],
                }),
            )
            .await?;

        let payload = data.product_options_create.ok_or_else(|| {
            ShopifyError::Parse("No payload from productOptionsCreate".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }

    /// Delete option axes from a product, repositioning remaining options.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, option_ids), fields(product_id = %product_id))]
    pub async fn delete_product_options(
        &self,
        product_id: &str,
        option_ids: &[String],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_options_delete: Option<UserErrorsPayload>,
        }

        let data: Data = self
            .graphql(
                "productOptionsDelete",
                PRODUCT_OPTIONS_DELETE,
                serde_json::json!({ "productId": product_id, "options": option_ids }),
            )
            .await?;

        let payload = data.product_options_delete.ok_or_else(|| {
            ShopifyError::Parse("No payload from productOptionsDelete".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }

    /// Bulk-create variants on a product, returning the created variants.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects any variant input.
    #[instrument(skip(self, variants), fields(product_id = %product_id, count = variants.len()))]
    pub async fn bulk_create_variants(
        &self,
        product_id: &str,
        variants: Vec<serde_json::Value>,
    ) -> Result<Vec<VariantNode>, ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            product_variants: Option<Vec<VariantNode>>,
            #[serde(default)]
            user_errors: Vec<UserErrorNode>,
        }

        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variants_bulk_create: Option<Payload>,
        }

        let data: Data = self
            .graphql(
                "productVariantsBulkCreate",
                VARIANTS_BULK_CREATE,
                serde_json::json!({ "productId": product_id, "variants": variants }),
            )
            .await?;

        let payload = data.product_variants_bulk_create.ok_or_else(|| {
            ShopifyError::Parse("No payload from productVariantsBulkCreate".to_string())
        })?;
        check_user_errors(&payload.user_errors)?;

        payload.product_variants.ok_or_else(|| {
            ShopifyError::Parse("No variants returned from bulk create".to_string())
        })
    }

    /// Bulk-update variant prices on a product.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects any variant input.
    #[instrument(skip(self, prices), fields(product_id = %product_id))]
    pub async fn bulk_update_variant_prices(
        &self,
        product_id: &str,
        prices: &[(String, String)],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variants_bulk_update: Option<UserErrorsPayload>,
        }

        let variants: Vec<serde_json::Value> = prices
            .iter()
            .map(|(id, price)| serde_json::json!({ "id": id, "price": price }))
            .collect();

        let data: Data = self
            .graphql(
                "productVariantsBulkUpdate",
                VARIANTS_BULK_UPDATE,
                serde_json::json!({ "productId": product_id, "variants": variants }),
            )
            .await?;

        let payload = data.product_variants_bulk_update.ok_or_else(|| {
            ShopifyError::Parse("No payload from productVariantsBulkUpdate".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }

    /// Bulk-delete variants from a product.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, variant_ids), fields(product_id = %product_id, count = variant_ids.len()))]
    pub async fn bulk_delete_variants(
        &self,
        product_id: &str,
        variant_ids: &[String],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variants_bulk_delete: Option<UserErrorsPayload>,
        }

        let data: Data = self
            .graphql(
                "productVariantsBulkDelete",
                VARIANTS_BULK_DELETE,
                serde_json::json!({ "productId": product_id, "variantsIds": variant_ids }),
            )
            .await?;

        let payload = data.product_variants_bulk_delete.ok_or_else(|| {
            ShopifyError::Parse("No payload from productVariantsBulkDelete".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }

    /// Write a metafield in the `bundle` namespace on a product.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, value), fields(owner_id = %owner_id, key = %key))]
    pub async fn set_metafield(
        &self,
        owner_id: &str,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metafields_set: Option<UserErrorsPayload>,
        }

        let data: Data = self
            .graphql(
                "metafieldsSet",
                METAFIELDS_SET,
                serde_json::json!({
                    "metafields": [{
                        "ownerId": owner_id,
                        "namespace": METAFIELD_NAMESPACE,
                        "key": key,
                        "value": value,
                        "type": value_type,
                    }],
                }),
            )
            .await?;

        let payload = data
            .metafields_set
            .ok_or_else(|| ShopifyError::Parse("No payload from metafieldsSet".to_string()))?;
        check_user_errors(&payload.user_errors)
    }

    /// Delete metafields in the `bundle` namespace from a product.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, keys), fields(owner_id = %owner_id))]
    pub async fn delete_metafields(
        &self,
        owner_id: &str,
        keys: &[&str],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metafields_delete: Option<UserErrorsPayload>,
        }

        let metafields: Vec<serde_json::Value> = keys
            .iter()
            .map(|key| {
                serde_json::json!({
                    "ownerId": owner_id,
                    "namespace": METAFIELD_NAMESPACE,
                    "key": key,
                })
            })
            .collect();

        let data: Data = self
            .graphql(
                "metafieldsDelete",
                METAFIELDS_DELETE,
                serde_json::json!({ "metafields": metafields }),
            )
            .await?;

        let payload = data
            .metafields_delete
            .ok_or_else(|| ShopifyError::Parse("No payload from metafieldsDelete".to_string()))?;
        check_user_errors(&payload.user_errors)
    }

    /// Link a piece of product media to variants.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects the input.
    #[instrument(skip(self, variant_ids), fields(product_id = %product_id, media_id = %media_id))]
    pub async fn append_variant_media(
        &self,
        product_id: &str,
        media_id: &str,
        variant_ids: &[String],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            product_variant_append_media: Option<UserErrorsPayload>,
        }

        let variant_media: Vec<serde_json::Value> = variant_ids
            .iter()
            .map(|id| serde_json::json!({ "variantId": id, "mediaIds": [media_id] }))
            .collect();

        let data: Data = self
            .graphql(
                "productVariantAppendMedia",
                VARIANT_APPEND_MEDIA,
                serde_json::json!({ "productId": product_id, "variantMedia": variant_media }),
            )
            .await?;

        let payload = data.product_variant_append_media.ok_or_else(|| {
            ShopifyError::Parse("No payload from productVariantAppendMedia".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }

    /// Push absolute available quantities in one batched call.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the platform rejects any quantity.
    #[instrument(skip(self, changes), fields(count = changes.len()))]
    pub async fn set_inventory_quantities(
        &self,
        changes: &[InventoryQuantityChange],
    ) -> Result<(), ShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            inventory_set_quantities: Option<UserErrorsPayload>,
        }

        let quantities: Vec<serde_json::Value> = changes
            .iter()
            .map(|c| {
                serde_json::json!({
                    "inventoryItemId": c.inventory_item_id,
                    "locationId": c.location_id,
                    "quantity": c.quantity.max(0),
                })
            })
            .collect();

        let data: Data = self
            .graphql(
                "inventorySetQuantities",
                INVENTORY_SET_QUANTITIES,
                serde_json::json!({
                    "input": {
                        "name": "available",
                        "reason": "correction",
                        "ignoreCompareQuantity": true,
                        "quantities": quantities,
                    },
                }),
            )
            .await?;

        let payload = data.inventory_set_quantities.ok_or_else(|| {
            ShopifyError::Parse("No payload from inventorySetQuantities".to_string())
        })?;
        check_user_errors(&payload.user_errors)
    }
}
