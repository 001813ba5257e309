//! Aggregation of the catalog into the dashboard report.
//!
//! All figures are computed inside one read transaction, so every field of a
//! report describes the same snapshot of the catalog. Money is summed in
//! `i128` cents in Rust since price times stock overflows SQLite's integers.

use rusqlite::{Connection, Row, params_from_iter};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error,
    category::{Category, map_category_row},
    product::{PRODUCT_COLUMNS, Product, map_product_row},
};

/// The number of entries in each of the top-N lists.
const TOP_N: usize = 5;

/// Products with at most this many units (but at least one) count as low on stock.
const LOW_STOCK_THRESHOLD: u32 = 10;

/// A category together with the number of products in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProductCount {
    /// The category.
    pub category: Category,
    /// The number of products that belong to the category.
    pub product_count: u64,
}

/// The number of products in a category, keyed by the category's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// The category name.
    pub name: String,
    /// The number of products that belong to the category.
    pub count: u64,
}

/// How many products are in stock and how many are sold out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockDistribution {
    /// Products with a stock quantity above zero.
    pub in_stock: u64,
    /// Products with a stock quantity of zero.
    pub out_of_stock: u64,
}

/// KPIs, top-N lists and chart data for the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    /// The number of products.
    pub total_products: u64,
    /// The number of products with a stock quantity above zero.
    pub products_in_stock: u64,
    /// The number of products with a stock quantity of zero.
    pub products_out_of_stock: u64,
    /// The number of categories.
    pub total_categories: u64,
    /// The mean product price, zero when there are no products.
    pub average_product_price: Decimal,
    /// The sum of price times stock quantity over all products.
    pub total_stock_value: Decimal,
    /// The most expensive products, most expensive first.
    pub top_expensive_products: Vec<Product>,
    /// The products with the most units in stock, largest stock first.
    pub top_stocked_products: Vec<Product>,
    /// Products that are nearly sold out, smallest stock first.
    pub low_stock_products: Vec<Product>,
    /// The categories with the most products, largest first.
    pub categories_with_product_counts: Vec<CategoryProductCount>,
    /// The product count of every category, ordered by category name.
    pub category_product_counts: Vec<CategoryCount>,
    /// In stock versus out of stock products.
    pub stock_distribution: StockDistribution,
}

struct Totals {
    product_count: u64,
    in_stock: u64,
    out_of_stock: u64,
    price_sum: Decimal,
    stock_value: Decimal,
}

/// Compute the dashboard report from the current contents of the catalog.
///
/// Ties in the top-N lists are broken by ID, i.e. insertion order.
///
/// # Errors
/// Returns [Error::SqlError] if any of the queries fail.
pub fn compute_dashboard(connection: &Connection) -> Result<DashboardReport, Error> {
    let transaction = connection.unchecked_transaction()?;

    let totals = get_totals(&transaction)?;
    let total_categories = transaction.query_row("SELECT COUNT(*) FROM category;", [], |row| {
        row.get::<_, u64>(0)
    })?;

    let top_expensive_products = get_products(
        &transaction,
        "ORDER BY product.price DESC, product.id ASC LIMIT ?1",
        [TOP_N as i64],
    )?;
    let top_stocked_products = get_products(
        &transaction,
        "ORDER BY product.stock_quantity DESC, product.id ASC LIMIT ?1",
        [TOP_N as i64],
    )?;
    let low_stock_products = get_products(
        &transaction,
        "WHERE product.stock_quantity > 0 AND product.stock_quantity <= ?1 \
        ORDER BY product.stock_quantity ASC, product.id ASC LIMIT ?2",
        [i64::from(LOW_STOCK_THRESHOLD), TOP_N as i64],
    )?;

    let categories_with_product_counts = get_top_categories(&transaction)?;
    let category_product_counts = get_category_counts(&transaction)?;

    transaction.commit()?;

    let average_product_price = if totals.product_count == 0 {
        Decimal::ZERO
    } else {
        totals.price_sum / Decimal::from(totals.product_count)
    };

    Ok(DashboardReport {
        total_products: totals.product_count,
        products_in_stock: totals.in_stock,
        products_out_of_stock: totals.out_of_stock,
        total_categories,
        average_product_price,
        total_stock_value: totals.stock_value,
        top_expensive_products,
        top_stocked_products,
        low_stock_products,
        categories_with_product_counts,
        category_product_counts,
        stock_distribution: StockDistribution {
            in_stock: totals.in_stock,
            out_of_stock: totals.out_of_stock,
        },
    })
}

/// Get the product count of every category, ordered by name.
///
/// Unlike the full report this only runs a single query, which is all the
/// chart endpoints need.
pub fn get_category_counts(connection: &Connection) -> Result<Vec<CategoryCount>, Error> {
    connection
        .prepare(
            "SELECT category.name, COUNT(product.id) FROM category
            LEFT JOIN product ON product.category_id = category.id
            GROUP BY category.id
            ORDER BY category.name ASC, category.id ASC;",
        )?
        .query_map([], |row| {
            Ok(CategoryCount {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .map(|count_result| count_result.map_err(Error::from))
        .collect()
}

/// Count the products that are in stock and out of stock.
pub fn get_stock_distribution(connection: &Connection) -> Result<StockDistribution, Error> {
    connection
        .query_row(
            "SELECT
                COALESCE(SUM(stock_quantity > 0), 0),
                COALESCE(SUM(stock_quantity = 0), 0)
            FROM product;",
            [],
            |row| {
                Ok(StockDistribution {
                    in_stock: row.get(0)?,
                    out_of_stock: row.get(1)?,
                })
            },
        )
        .map_err(Error::from)
}

fn get_totals(connection: &Connection) -> Result<Totals, Error> {
    let distribution = get_stock_distribution(connection)?;

    let mut price_sum_cents: i128 = 0;
    let mut stock_value_cents: i128 = 0;

    let mut statement = connection.prepare("SELECT price, stock_quantity FROM product;")?;
    let rows = statement.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    for row in rows {
        let (price_cents, stock_quantity) = row?;
        let price_cents = i128::from(price_cents);

        price_sum_cents = price_sum_cents
            .checked_add(price_cents)
            .ok_or(Error::AggregateOverflow("sum of prices"))?;
        stock_value_cents = price_cents
            .checked_mul(i128::from(stock_quantity))
            .and_then(|value| stock_value_cents.checked_add(value))
            .ok_or(Error::AggregateOverflow("total stock value"))?;
    }

    Ok(Totals {
        product_count: distribution.in_stock + distribution.out_of_stock,
        in_stock: distribution.in_stock,
        out_of_stock: distribution.out_of_stock,
        price_sum: cents_to_decimal(price_sum_cents, "sum of prices")?,
        stock_value: cents_to_decimal(stock_value_cents, "total stock value")?,
    })
}

fn cents_to_decimal(cents: i128, name: &'static str) -> Result<Decimal, Error> {
    Decimal::try_from_i128_with_scale(cents, 2).map_err(|_| Error::AggregateOverflow(name))
}

fn get_products<const N: usize>(
    connection: &Connection,
    clauses: &str,
    params: [i64; N],
) -> Result<Vec<Product>, Error> {
    connection
        .prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM product {clauses};"))?
        .query_map(params_from_iter(params), map_product_row)?
        .map(|product_result| product_result.map_err(Error::from))
        .collect()
}

fn get_top_categories(connection: &Connection) -> Result<Vec<CategoryProductCount>, Error> {
    connection
        .prepare(
            "SELECT category.id, category.name, category.description, COUNT(product.id) AS product_count
            FROM category
            LEFT JOIN product ON product.category_id = category.id
            GROUP BY category.id
            ORDER BY product_count DESC, category.id ASC
            LIMIT ?1;",
        )?
        .query_map([TOP_N as i64], map_category_count_row)?
        .map(|count_result| count_result.map_err(Error::from))
        .collect()
}

fn map_category_count_row(row: &Row) -> Result<CategoryProductCount, rusqlite::Error> {
    Ok(CategoryProductCount {
        category: map_category_row(row)?,
        product_count: row.get(3)?,
    })
}

#[cfg(test)]
mod compute_dashboard_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;

    use crate::{
        category::{CategoryId, CategoryName, NewCategory, create_category, delete_category},
        db::initialize,
        product::{Price, Product, StockQuantity, create_product},
    };

    use super::{CategoryCount, StockDistribution, compute_dashboard};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn insert_category(name: &str, connection: &Connection) -> CategoryId {
        create_category(
            NewCategory {
                name: CategoryName::new_unchecked(name),
                description: None,
            },
            connection,
        )
        .expect("Could not create test category")
        .id
    }

    fn insert_product(
        name: &str,
        cents: i64,
        stock: u32,
        category_id: Option<CategoryId>,
        connection: &Connection,
    ) -> Product {
        let mut builder = Product::build(name, "", Price::from_cents(cents))
            .stock_quantity(StockQuantity::from(stock));
        if let Some(category_id) = category_id {
            builder = builder.category(category_id);
        }

        create_product(builder, connection).expect("Could not create test product")
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|product| product.name.as_str()).collect()
    }

    #[test]
    fn empty_catalog_reports_zeros() {
        let conn = get_test_connection();

        let report = compute_dashboard(&conn).unwrap();

        assert_eq!(report.total_products, 0);
        assert_eq!(report.total_categories, 0);
        assert_eq!(report.average_product_price, Decimal::ZERO);
        assert_eq!(report.total_stock_value, Decimal::ZERO);
        assert!(report.top_expensive_products.is_empty());
        assert!(report.low_stock_products.is_empty());
        assert!(report.category_product_counts.is_empty());
        assert_eq!(
            report.stock_distribution,
            StockDistribution {
                in_stock: 0,
                out_of_stock: 0
            }
        );
    }

    #[test]
    fn counts_stock_levels() {
        let conn = get_test_connection();
        for (name, stock) in [("a", 0), ("b", 5), ("c", 10), ("d", 15), ("e", 0)] {
            insert_product(name, 100, stock, None, &conn);
        }

        let report = compute_dashboard(&conn).unwrap();

        assert_eq!(report.total_products, 5);
        assert_eq!(report.products_in_stock, 3);
        assert_eq!(report.products_out_of_stock, 2);
        assert_eq!(names(&report.low_stock_products), vec!["b", "c"]);
        assert_eq!(
            report.stock_distribution,
            StockDistribution {
                in_stock: 3,
                out_of_stock: 2
            }
        );
    }

    #[test]
    fn stock_value_and_average_are_exact() {
        let conn = get_test_connection();
        insert_product("a", 10, 3, None, &conn);
        insert_product("b", 20, 7, None, &conn);
        insert_product("c", 1999, 1, None, &conn);

        let report = compute_dashboard(&conn).unwrap();

        // 0.10 * 3 + 0.20 * 7 + 19.99 * 1
        assert_eq!(report.total_stock_value, Decimal::new(2169, 2));
        // (0.10 + 0.20 + 19.99) / 3
        assert_eq!(
            report.average_product_price,
            Decimal::new(2029, 2) / Decimal::from(3)
        );
    }

    #[test]
    fn stock_value_of_largest_products_does_not_overflow() {
        let conn = get_test_connection();
        let max_cents = 9_999_999_999;
        insert_product("a", max_cents, 1_000_000_000, None, &conn);
        insert_product("b", max_cents, u32::MAX, None, &conn);

        let report = compute_dashboard(&conn).unwrap();

        let max_price = Decimal::new(max_cents, 2);
        assert_eq!(
            report.total_stock_value,
            max_price * Decimal::from(1_000_000_000u64 + u64::from(u32::MAX))
        );
        assert_eq!(report.average_product_price, max_price);
    }

    #[test]
    fn top_lists_break_ties_by_insertion_order() {
        let conn = get_test_connection();
        for (name, cents, stock) in [
            ("first", 500, 3),
            ("second", 900, 3),
            ("third", 500, 9),
            ("fourth", 100, 3),
            ("fifth", 500, 1),
            ("sixth", 500, 3),
        ] {
            insert_product(name, cents, stock, None, &conn);
        }

        let report = compute_dashboard(&conn).unwrap();

        assert_eq!(
            names(&report.top_expensive_products),
            vec!["second", "first", "third", "fifth", "sixth"]
        );
        assert_eq!(
            names(&report.top_stocked_products),
            vec!["third", "first", "second", "fourth", "sixth"]
        );
    }

    #[test]
    fn low_stock_is_limited_to_five() {
        let conn = get_test_connection();
        for stock in [9, 8, 7, 6, 5, 4, 11] {
            insert_product(&format!("stock {stock}"), 100, stock, None, &conn);
        }

        let report = compute_dashboard(&conn).unwrap();

        let stock: Vec<u32> = report
            .low_stock_products
            .iter()
            .map(|product| product.stock_quantity.get())
            .collect();
        assert_eq!(stock, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn category_counts_cover_every_category() {
        let conn = get_test_connection();
        let toys = insert_category("Toys", &conn);
        let books = insert_category("Books", &conn);
        insert_category("Art", &conn);
        insert_product("Guide", 999, 1, Some(books), &conn);
        insert_product("Novel", 1299, 1, Some(books), &conn);
        insert_product("Yo-yo", 300, 1, Some(toys), &conn);
        insert_product("Loose", 100, 1, None, &conn);

        let report = compute_dashboard(&conn).unwrap();

        assert_eq!(report.total_categories, 3);
        assert_eq!(
            report.category_product_counts,
            vec![
                CategoryCount {
                    name: "Art".to_owned(),
                    count: 0
                },
                CategoryCount {
                    name: "Books".to_owned(),
                    count: 2
                },
                CategoryCount {
                    name: "Toys".to_owned(),
                    count: 1
                },
            ]
        );
        let top: Vec<(&str, u64)> = report
            .categories_with_product_counts
            .iter()
            .map(|entry| (entry.category.name.as_ref(), entry.product_count))
            .collect();
        assert_eq!(top, vec![("Books", 2), ("Toys", 1), ("Art", 0)]);
    }

    #[test]
    fn deleted_category_products_are_uncategorised() {
        let conn = get_test_connection();
        let books = insert_category("Books", &conn);
        insert_product("Guide", 999, 1, Some(books), &conn);
        delete_category(books, &conn).unwrap();

        let report = compute_dashboard(&conn).unwrap();

        assert_eq!(report.total_products, 1);
        assert!(report.category_product_counts.is_empty());
        assert_eq!(report.top_expensive_products[0].category_id, None);
    }
}
