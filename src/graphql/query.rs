//! Read-only GraphQL queries.

use async_graphql::{Context, ErrorExtensions, ID, Object};
use rust_decimal::Decimal;

use crate::{
    Error,
    category::{find_category, get_all_categories},
    database_id::parse_id,
    graphql::{
        types::{CategoryNode, ProductNode},
        with_connection,
    },
    product::{ProductFilter, ProductOrdering, find_product, list_products},
};

/// The root of all GraphQL queries.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get a product by ID, or null if there is no such product.
    async fn product(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<ProductNode>> {
        let Some(product_id) = parse_id(&id) else {
            return Ok(None);
        };

        with_connection(ctx, |connection| find_product(product_id, connection))
            .map(|product| product.map(ProductNode))
    }

    /// List products, optionally filtered and sorted.
    ///
    /// `orderBy` is a field name such as `price` or `stockQuantity`, prefix
    /// it with `-` to sort in descending order.
    #[allow(clippy::too_many_arguments)]
    async fn products(
        &self,
        ctx: &Context<'_>,
        category_id: Option<ID>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
        search: Option<String>,
        order_by: Option<String>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<ProductNode>> {
        let filter = build_filter(
            category_id, min_price, max_price, search, order_by, limit, offset,
        )
        .map_err(|error| error.extend())?;

        with_connection(ctx, |connection| list_products(&filter, connection))
            .map(|products| products.into_iter().map(ProductNode).collect())
    }

    /// Get a category by ID, or null if there is no such category.
    async fn category(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<CategoryNode>> {
        let Some(category_id) = parse_id(&id) else {
            return Ok(None);
        };

        with_connection(ctx, |connection| find_category(category_id, connection))
            .map(|category| category.map(CategoryNode))
    }

    /// List all categories in creation order.
    async fn categories(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CategoryNode>> {
        with_connection(ctx, get_all_categories)
            .map(|categories| categories.into_iter().map(CategoryNode).collect())
    }
}

fn build_filter(
    category_id: Option<ID>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    search: Option<String>,
    order_by: Option<String>,
    limit: Option<i32>,
    offset: Option<i32>,
) -> Result<ProductFilter, Error> {
    let category_id = category_id
        .map(|id| parse_id(&id).ok_or_else(|| Error::InvalidId(id.to_string())))
        .transpose()?;

    let order_by = order_by
        .map(|field| field.parse::<ProductOrdering>())
        .transpose()?;

    Ok(ProductFilter {
        category_id,
        min_price,
        max_price,
        search,
        order_by,
        limit: non_negative(limit, "limit")?,
        offset: non_negative(offset, "offset")?,
    })
}

fn non_negative(value: Option<i32>, name: &'static str) -> Result<Option<u32>, Error> {
    value
        .map(|value| u32::try_from(value).map_err(|_| Error::NegativePagination(name)))
        .transpose()
}
