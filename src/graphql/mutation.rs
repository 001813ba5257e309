//! GraphQL mutations for creating, updating and deleting catalog records.

use async_graphql::{Context, ErrorExtensions, ID, MaybeUndefined, Object};
use rust_decimal::Decimal;

use crate::{
    Error,
    category::{
        CategoryName, CategoryPatch, NewCategory, create_category, delete_category,
        update_category,
    },
    database_id::parse_id,
    graphql::{
        types::{CategoryNode, CategoryPayload, DeletePayload, ProductNode, ProductPayload},
        with_connection,
    },
    product::{
        Currency, Price, Product, ProductPatch, StockQuantity, create_product, delete_product,
        update_product,
    },
};

/// The root of all GraphQL mutations.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create a category. Fails with `CONFLICT` if the name is taken.
    async fn create_category(
        &self,
        ctx: &Context<'_>,
        name: String,
        description: Option<String>,
    ) -> async_graphql::Result<CategoryPayload> {
        let category = NewCategory {
            name: CategoryName::new(&name).map_err(|error| error.extend())?,
            description,
        };

        with_connection(ctx, |connection| create_category(category, connection)).map(|category| {
            CategoryPayload {
                category: CategoryNode(category),
            }
        })
    }

    /// Change the supplied fields of a category. An explicit null description clears it.
    async fn update_category(
        &self,
        ctx: &Context<'_>,
        id: ID,
        name: Option<String>,
        description: MaybeUndefined<String>,
    ) -> async_graphql::Result<CategoryPayload> {
        let category_id = parse_id(&id).ok_or_else(|| Error::UpdateMissingCategory.extend())?;
        let patch = CategoryPatch {
            name: name
                .as_deref()
                .map(CategoryName::new)
                .transpose()
                .map_err(|error| error.extend())?,
            description: maybe_undefined_to_patch(description),
        };

        with_connection(ctx, |connection| update_category(category_id, patch, connection)).map(
            |category| CategoryPayload {
                category: CategoryNode(category),
            },
        )
    }

    /// Delete a category. Its products are kept without a category.
    async fn delete_category(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<DeletePayload> {
        let category_id = parse_id(&id).ok_or_else(|| Error::DeleteMissingCategory.extend())?;

        with_connection(ctx, |connection| delete_category(category_id, connection))
            .map(|_| DeletePayload { ok: true })
    }

    /// Create a product in an existing category.
    #[allow(clippy::too_many_arguments)]
    async fn create_product(
        &self,
        ctx: &Context<'_>,
        name: String,
        description: String,
        price: Decimal,
        currency: String,
        image_url: Option<String>,
        stock_quantity: Option<i64>,
        category_id: ID,
    ) -> async_graphql::Result<ProductPayload> {
        let build = || -> Result<_, Error> {
            let category_id = parse_id(&category_id).ok_or(Error::NotFound)?;
            let stock_quantity = stock_quantity
                .map(StockQuantity::new)
                .transpose()?
                .unwrap_or_default();

            Ok(Product::build(&name, &description, Price::new(price)?)
                .currency(Currency::new(&currency)?)
                .image_url(image_url)
                .stock_quantity(stock_quantity)
                .category(category_id))
        };
        let builder = build().map_err(|error| error.extend())?;

        with_connection(ctx, |connection| create_product(builder, connection)).map(|product| {
            ProductPayload {
                product: ProductNode(product),
            }
        })
    }

    /// Change the supplied fields of a product.
    ///
    /// An explicit null `imageUrl` removes the image. If `categoryId` does
    /// not refer to an existing category, nothing is changed.
    #[allow(clippy::too_many_arguments)]
    async fn update_product(
        &self,
        ctx: &Context<'_>,
        id: ID,
        name: Option<String>,
        description: Option<String>,
        price: Option<Decimal>,
        currency: Option<String>,
        image_url: MaybeUndefined<String>,
        stock_quantity: Option<i64>,
        category_id: Option<ID>,
    ) -> async_graphql::Result<ProductPayload> {
        let product_id = parse_id(&id).ok_or_else(|| Error::UpdateMissingProduct.extend())?;

        let build = || -> Result<_, Error> {
            Ok(ProductPatch {
                name,
                description,
                price: price.map(Price::new).transpose()?,
                currency: currency.as_deref().map(Currency::new).transpose()?,
                image_url: maybe_undefined_to_patch(image_url),
                stock_quantity: stock_quantity.map(StockQuantity::new).transpose()?,
                category_id: category_id
                    .map(|id| parse_id(&id).ok_or(Error::NotFound))
                    .transpose()?,
            })
        };
        let patch = build().map_err(|error| error.extend())?;

        with_connection(ctx, |connection| update_product(product_id, patch, connection)).map(
            |product| ProductPayload {
                product: ProductNode(product),
            },
        )
    }

    /// Delete a product.
    async fn delete_product(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<DeletePayload> {
        let product_id = parse_id(&id).ok_or_else(|| Error::DeleteMissingProduct.extend())?;

        with_connection(ctx, |connection| delete_product(product_id, connection))
            .map(|_| DeletePayload { ok: true })
    }
}

/// Absent fields are left alone, explicit nulls clear the field.
fn maybe_undefined_to_patch<T>(value: MaybeUndefined<T>) -> Option<Option<T>> {
    match value {
        MaybeUndefined::Undefined => None,
        MaybeUndefined::Null => Some(None),
        MaybeUndefined::Value(value) => Some(Some(value)),
    }
}
