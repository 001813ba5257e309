//! Product management for the catalog.
//!
//! This module contains everything related to products:
//! - The `Product` model, its validated field types and `ProductBuilder`
//! - Database functions for storing, updating and deleting products
//! - The filtered, sorted product listing used by the query API

mod db;
mod domain;
mod query;

pub use db::{
    count_products, create_product, create_product_table, delete_product, find_product,
    get_product, map_product_row, update_product,
};
pub use domain::{Currency, Price, Product, ProductBuilder, ProductId, ProductPatch, StockQuantity};
pub use query::{ProductFilter, ProductOrdering, SortField, SortOrder, list_products};

/// The columns of the product table in the order [map_product_row] expects.
pub(crate) const PRODUCT_COLUMNS: &str = "product.id, product.name, product.description, \
    product.price, product.currency, product.image_url, product.stock_quantity, \
    product.category_id, product.created_at, product.updated_at";
