//! The GraphQL output types and mutation payloads.

use async_graphql::{Context, ID, Object, SimpleObject};
use rust_decimal::Decimal;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    category::{Category, find_category},
    graphql::{internal_error, with_connection},
    product::{Product, ProductFilter, list_products},
};

/// A group of products.
pub struct CategoryNode(pub Category);

#[Object(name = "Category")]
impl CategoryNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        self.0.name.as_ref()
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// The products in this category, in creation order.
    async fn products(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<ProductNode>> {
        let filter = ProductFilter {
            category_id: Some(self.0.id),
            ..Default::default()
        };

        with_connection(ctx, |connection| list_products(&filter, connection))
            .map(|products| products.into_iter().map(ProductNode).collect())
    }
}

/// An item for sale.
pub struct ProductNode(pub Product);

#[Object(name = "Product")]
impl ProductNode {
    async fn id(&self) -> ID {
        ID::from(self.0.id.to_string())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn description(&self) -> &str {
        &self.0.description
    }

    async fn price(&self) -> Decimal {
        self.0.price.amount()
    }

    async fn currency(&self) -> &str {
        self.0.currency.as_ref()
    }

    async fn image_url(&self) -> Option<&str> {
        self.0.image_url.as_deref()
    }

    async fn stock_quantity(&self) -> u32 {
        self.0.stock_quantity.get()
    }

    /// The category the product belongs to, or null if it has none.
    async fn category(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<CategoryNode>> {
        let Some(category_id) = self.0.category_id else {
            return Ok(None);
        };

        with_connection(ctx, |connection| find_category(category_id, connection))
            .map(|category| category.map(CategoryNode))
    }

    /// When the product was created, in RFC 3339 format.
    async fn created_at(&self) -> async_graphql::Result<String> {
        format_timestamp(self.0.created_at)
    }

    /// When the product was last changed, in RFC 3339 format.
    async fn updated_at(&self) -> async_graphql::Result<String> {
        format_timestamp(self.0.updated_at)
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> async_graphql::Result<String> {
    timestamp.format(&Rfc3339).map_err(|error| {
        tracing::error!("could not format timestamp {timestamp:?}: {error}");
        internal_error()
    })
}

/// The result of creating or updating a category.
#[derive(SimpleObject)]
pub struct CategoryPayload {
    /// The category as stored.
    pub category: CategoryNode,
}

/// The result of creating or updating a product.
#[derive(SimpleObject)]
pub struct ProductPayload {
    /// The product as stored.
    pub product: ProductNode,
}

/// The result of a delete.
#[derive(SimpleObject)]
pub struct DeletePayload {
    /// Whether the record was deleted.
    pub ok: bool,
}
