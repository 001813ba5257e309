//! Filtered and sorted product listings.

use std::str::FromStr;

use rusqlite::{Connection, params_from_iter, types::Value};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    Error,
    category::CategoryId,
    db::UNICODE_LOWER,
    product::{PRODUCT_COLUMNS, Product, map_product_row},
};

/// The product columns that listings can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Creation order.
    Id,
    /// Alphabetical by name.
    Name,
    /// Alphabetical by description.
    Description,
    /// Numeric by price.
    Price,
    /// Alphabetical by currency code.
    Currency,
    /// Numeric by stock quantity.
    StockQuantity,
    /// Chronological by creation time.
    CreatedAt,
    /// Chronological by the time of the last change.
    UpdatedAt,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::Id => "product.id",
            SortField::Name => "product.name",
            SortField::Description => "product.description",
            SortField::Price => "product.price",
            SortField::Currency => "product.currency",
            SortField::StockQuantity => "product.stock_quantity",
            SortField::CreatedAt => "product.created_at",
            SortField::UpdatedAt => "product.updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    /// Accepts both the column names (`stock_quantity`) and the API field names (`stockQuantity`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "name" => Ok(SortField::Name),
            "description" => Ok(SortField::Description),
            "price" => Ok(SortField::Price),
            "currency" => Ok(SortField::Currency),
            "stock_quantity" | "stockQuantity" => Ok(SortField::StockQuantity),
            "created_at" | "createdAt" => Ok(SortField::CreatedAt),
            "updated_at" | "updatedAt" => Ok(SortField::UpdatedAt),
            _ => Err(Error::InvalidSortField(s.to_owned())),
        }
    }
}

/// The order to sort products in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[default]
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

/// A sort field and direction.
///
/// Parsed from strings like `"price"` (ascending) or `"-price"` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductOrdering {
    /// The column to sort by.
    pub field: SortField,
    /// The sort direction.
    pub order: SortOrder,
}

impl FromStr for ProductOrdering {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (order, field) = match s.strip_prefix('-') {
            Some(field) => (SortOrder::Descending, field),
            None => (SortOrder::Ascending, s),
        };

        Ok(Self {
            field: field.parse()?,
            order,
        })
    }
}

/// The filters for listing products.
///
/// All filters are optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Only products in this category.
    pub category_id: Option<CategoryId>,
    /// Only products that cost at least this much.
    pub min_price: Option<Decimal>,
    /// Only products that cost at most this much.
    pub max_price: Option<Decimal>,
    /// Only products whose name or description contains this text, ignoring case.
    pub search: Option<String>,
    /// How to sort the results. Defaults to creation order.
    pub order_by: Option<ProductOrdering>,
    /// The maximum number of products to return.
    pub limit: Option<u32>,
    /// The number of products to skip.
    pub offset: Option<u32>,
}

/// Get the products matching `filter`.
///
/// Results are always ordered by ID after the requested ordering so that
/// products with equal sort keys come back in a stable order.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn list_products(filter: &ProductFilter, connection: &Connection) -> Result<Vec<Product>, Error> {
    let mut conditions = Vec::new();
    let mut parameters = Vec::new();

    if let Some(category_id) = filter.category_id {
        parameters.push(Value::Integer(category_id));
        conditions.push(format!("product.category_id = ?{}", parameters.len()));
    }

    if let Some(min_price) = filter.min_price {
        parameters.push(Value::Integer(lower_bound_in_cents(min_price)));
        conditions.push(format!("product.price >= ?{}", parameters.len()));
    }

    if let Some(max_price) = filter.max_price {
        parameters.push(Value::Integer(upper_bound_in_cents(max_price)));
        conditions.push(format!("product.price <= ?{}", parameters.len()));
    }

    if let Some(search) = filter.search.as_deref().map(str::trim)
        && !search.is_empty()
    {
        parameters.push(Value::Text(search.to_lowercase()));
        let index = parameters.len();
        conditions.push(format!(
            "(instr({UNICODE_LOWER}(product.name), ?{index}) > 0 \
            OR instr({UNICODE_LOWER}(product.description), ?{index}) > 0)"
        ));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let order_clause = match filter.order_by {
        Some(ProductOrdering { field, order }) => format!(
            "ORDER BY {} {}, product.id ASC",
            field.column(),
            match order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            }
        ),
        None => "ORDER BY product.id ASC".to_owned(),
    };

    // SQLite only accepts OFFSET after a LIMIT, -1 means no limit.
    let limit_clause = match (filter.limit, filter.offset) {
        (None, None) => String::new(),
        (limit, offset) => {
            parameters.push(Value::Integer(limit.map_or(-1, i64::from)));
            parameters.push(Value::Integer(offset.map_or(0, i64::from)));
            format!(
                "LIMIT ?{} OFFSET ?{}",
                parameters.len() - 1,
                parameters.len()
            )
        }
    };

    let query =
        format!("SELECT {PRODUCT_COLUMNS} FROM product {where_clause} {order_clause} {limit_clause}");

    tracing::debug!("Listing products with query: {query}");

    connection
        .prepare(&query)?
        .query_map(params_from_iter(parameters), map_product_row)?
        .map(|product_result| product_result.map_err(Error::from))
        .collect()
}

/// The smallest whole number of cents that is not below `amount`.
fn lower_bound_in_cents(amount: Decimal) -> i64 {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.ceil().to_i64())
        .unwrap_or(saturate(amount))
}

/// The largest whole number of cents that is not above `amount`.
fn upper_bound_in_cents(amount: Decimal) -> i64 {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.floor().to_i64())
        .unwrap_or(saturate(amount))
}

fn saturate(amount: Decimal) -> i64 {
    if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    }
}

#[cfg(test)]
mod parse_tests {
    use crate::{
        Error,
        product::{ProductOrdering, SortField, SortOrder},
    };

    #[test]
    fn plain_field_sorts_ascending() {
        assert_eq!(
            "price".parse::<ProductOrdering>(),
            Ok(ProductOrdering {
                field: SortField::Price,
                order: SortOrder::Ascending
            })
        );
    }

    #[test]
    fn dash_prefix_sorts_descending() {
        assert_eq!(
            "-stock_quantity".parse::<ProductOrdering>(),
            Ok(ProductOrdering {
                field: SortField::StockQuantity,
                order: SortOrder::Descending
            })
        );
    }

    #[test]
    fn accepts_api_field_names() {
        assert_eq!("createdAt".parse::<SortField>(), Ok(SortField::CreatedAt));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert_eq!(
            "category__name".parse::<ProductOrdering>(),
            Err(Error::InvalidSortField("category__name".to_owned()))
        );
        assert_eq!(
            "-".parse::<ProductOrdering>(),
            Err(Error::InvalidSortField(String::new()))
        );
    }
}
