//! Database operations for products.

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{CategoryId, find_category},
    product::{
        PRODUCT_COLUMNS, Price, Product, ProductBuilder, ProductId, ProductPatch, StockQuantity,
        domain::{Currency, validate_product_name},
    },
};

/// Create a product and return it as stored in the database.
///
/// The category check and the insert happen in one transaction, so the
/// product can never be written with a dangling category reference.
///
/// # Errors
/// Returns:
/// - [Error::EmptyProductName] if the name is empty,
/// - [Error::InvalidCategory] if the category does not exist, in which case nothing is written,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_product(builder: ProductBuilder, connection: &Connection) -> Result<Product, Error> {
    let name = validate_product_name(&builder.name)?;

    let transaction = connection.unchecked_transaction()?;

    if let Some(category_id) = builder.category_id {
        ensure_category_exists(category_id, &transaction)?;
    }

    let now = OffsetDateTime::now_utc();

    transaction
        .execute(
            "INSERT INTO product (name, description, price, currency, image_url, stock_quantity, \
            category_id, created_at, updated_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                name,
                builder.description,
                builder.price.cents(),
                builder.currency.as_ref(),
                builder.image_url,
                builder.stock_quantity.get(),
                builder.category_id,
                now,
            ],
        )
        .map_err(|error| map_foreign_key_error(error, builder.category_id))?;

    let id = transaction.last_insert_rowid();
    let product = get_product(id, &transaction)?;

    transaction.commit()?;

    Ok(product)
}

/// Retrieve a single product by ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no product with the ID `product_id`.
pub fn get_product(product_id: ProductId, connection: &Connection) -> Result<Product, Error> {
    connection
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE product.id = :id;"
        ))?
        .query_row(&[(":id", &product_id)], map_product_row)
        .map_err(|error| error.into())
}

/// Retrieve a single product by ID, or `None` if it does not exist.
pub fn find_product(
    product_id: ProductId,
    connection: &Connection,
) -> Result<Option<Product>, Error> {
    connection
        .prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE product.id = :id;"
        ))?
        .query_row(&[(":id", &product_id)], map_product_row)
        .optional()
        .map_err(|error| error.into())
}

/// Count the products in the catalog.
pub fn count_products(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(*) FROM product;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Apply `patch` to the product with the ID `product_id` and return the updated product.
///
/// The update is all-or-nothing: if any supplied field is invalid no field is changed.
///
/// # Errors
/// Returns:
/// - [Error::UpdateMissingProduct] if the product does not exist,
/// - [Error::InvalidCategory] if the patch refers to a category that does not exist,
/// - [Error::EmptyProductName] if the new name is empty.
pub fn update_product(
    product_id: ProductId,
    patch: ProductPatch,
    connection: &Connection,
) -> Result<Product, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut product = match get_product(product_id, &transaction) {
        Ok(product) => product,
        Err(Error::NotFound) => return Err(Error::UpdateMissingProduct),
        Err(error) => return Err(error),
    };

    if let Some(category_id) = patch.category_id {
        ensure_category_exists(category_id, &transaction)?;
        product.category_id = Some(category_id);
    }

    if let Some(name) = patch.name {
        product.name = validate_product_name(&name)?;
    }

    if let Some(description) = patch.description {
        product.description = description;
    }

    if let Some(price) = patch.price {
        product.price = price;
    }

    if let Some(currency) = patch.currency {
        product.currency = currency;
    }

    if let Some(image_url) = patch.image_url {
        product.image_url = image_url;
    }

    if let Some(stock_quantity) = patch.stock_quantity {
        product.stock_quantity = stock_quantity;
    }

    transaction
        .execute(
            "UPDATE product \
            SET \
                name = ?1, \
                description = ?2, \
                price = ?3, \
                currency = ?4, \
                image_url = ?5, \
                stock_quantity = ?6, \
                category_id = ?7, \
                updated_at = ?8 \
            WHERE id = ?9",
            params![
                product.name,
                product.description,
                product.price.cents(),
                product.currency.as_ref(),
                product.image_url,
                product.stock_quantity.get(),
                product.category_id,
                OffsetDateTime::now_utc(),
                product_id,
            ],
        )
        .map_err(|error| map_foreign_key_error(error, product.category_id))?;

    let product = get_product(product_id, &transaction)?;

    transaction.commit()?;

    Ok(product)
}

/// Delete a product by ID.
///
/// # Errors
/// Returns [Error::DeleteMissingProduct] if the product doesn't exist.
pub fn delete_product(product_id: ProductId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM product WHERE id = ?1", [product_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingProduct);
    }

    Ok(())
}

/// Initialize the product table and indexes.
///
/// Deleting a category sets the category of its products to null rather
/// than deleting them.
pub fn create_product_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            price INTEGER NOT NULL CHECK (price >= 0),
            currency TEXT NOT NULL DEFAULT 'USD',
            image_url TEXT,
            stock_quantity INTEGER NOT NULL DEFAULT 0 CHECK (stock_quantity >= 0),
            category_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_product_category_id ON product(category_id);
        CREATE INDEX IF NOT EXISTS idx_product_price ON product(price);",
    )?;

    Ok(())
}

/// Map a row selected with [PRODUCT_COLUMNS] to a [Product].
pub fn map_product_row(row: &Row) -> Result<Product, rusqlite::Error> {
    let raw_currency: String = row.get(4)?;
    let raw_stock_quantity: u32 = row.get(6)?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: Price::from_cents(row.get(3)?),
        currency: Currency::new_unchecked(&raw_currency),
        image_url: row.get(5)?,
        stock_quantity: StockQuantity::from(raw_stock_quantity),
        category_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn ensure_category_exists(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    match find_category(category_id, connection)? {
        Some(_) => Ok(()),
        None => Err(Error::InvalidCategory(category_id)),
    }
}

fn map_foreign_key_error(error: rusqlite::Error, category_id: Option<CategoryId>) -> Error {
    match (error, category_id) {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        (rusqlite::Error::SqliteFailure(sql_error, _), Some(category_id))
            if sql_error.extended_code == 787 =>
        {
            Error::InvalidCategory(category_id)
        }
        (error, _) => error.into(),
    }
}

#[cfg(test)]
mod product_query_tests {
    use std::{thread, time::Duration};

    use rusqlite::Connection;
    use rust_decimal::Decimal;

    use crate::{
        Error,
        category::{CategoryName, NewCategory, create_category, delete_category},
        db::initialize,
        product::{
            Currency, Price, Product, ProductPatch, StockQuantity, count_products, create_product,
            delete_product, find_product, get_product, update_product,
        },
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_category(name: &str, connection: &Connection) -> i64 {
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

    fn price(cents: i64) -> Price {
        Price::from_cents(cents)
    }

    #[test]
    fn create_product_succeeds() {
        let connection = get_test_db_connection();
        let books = create_test_category("Books", &connection);

        let product = create_product(
            Product::build("Guide", "x", Price::new(Decimal::new(999, 2)).unwrap())
                .currency(Currency::new("USD").unwrap())
                .category(books),
            &connection,
        )
        .expect("Could not create product");

        assert!(product.id > 0);
        assert_eq!(product.name, "Guide");
        assert_eq!(product.price.amount(), Decimal::new(999, 2));
        assert_eq!(product.category_id, Some(books));
        assert_eq!(product.created_at, product.updated_at);
        assert_eq!(get_product(product.id, &connection), Ok(product));
    }

    #[test]
    fn create_product_uses_defaults() {
        let connection = get_test_db_connection();

        let product = create_product(Product::build("Mug", "A mug", price(500)), &connection)
            .expect("Could not create product");

        assert_eq!(product.currency.as_ref(), "USD");
        assert_eq!(product.stock_quantity.get(), 0);
        assert_eq!(product.image_url, None);
        assert_eq!(product.category_id, None);
    }

    #[test]
    fn create_product_with_missing_category_writes_nothing() {
        let connection = get_test_db_connection();

        let result = create_product(
            Product::build("Guide", "x", price(999)).category(42),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidCategory(42)));
        assert_eq!(count_products(&connection), Ok(0));
    }

    #[test]
    fn create_product_with_empty_name_fails() {
        let connection = get_test_db_connection();

        let result = create_product(Product::build("  ", "x", price(999)), &connection);

        assert_eq!(result, Err(Error::EmptyProductName));
        assert_eq!(count_products(&connection), Ok(0));
    }

    #[test]
    fn find_product_with_invalid_id_returns_none() {
        let connection = get_test_db_connection();

        assert_eq!(find_product(1234, &connection), Ok(None));
    }

    #[test]
    fn update_product_only_changes_supplied_fields() {
        let connection = get_test_db_connection();
        let product = create_product(
            Product::build("T-Shirt", "Cotton", price(1500))
                .stock_quantity(StockQuantity::from(3))
                .image_url(Some("https://example.com/t-shirt.jpg".to_owned())),
            &connection,
        )
        .unwrap();
        // Make sure the clock has moved on so the new timestamp differs.
        thread::sleep(Duration::from_millis(10));

        let updated = update_product(
            product.id,
            ProductPatch {
                price: Some(price(1250)),
                stock_quantity: Some(StockQuantity::from(10)),
                ..Default::default()
            },
            &connection,
        )
        .expect("Could not update product");

        assert_eq!(updated.price, price(1250));
        assert_eq!(updated.stock_quantity.get(), 10);
        assert_eq!(updated.name, product.name);
        assert_eq!(updated.description, product.description);
        assert_eq!(updated.image_url, product.image_url);
        assert_eq!(updated.created_at, product.created_at);
        assert!(updated.updated_at > product.updated_at);
    }

    #[test]
    fn update_product_can_remove_image() {
        let connection = get_test_db_connection();
        let product = create_product(
            Product::build("Lamp", "Bright", price(2000))
                .image_url(Some("https://example.com/lamp.jpg".to_owned())),
            &connection,
        )
        .unwrap();

        let updated = update_product(
            product.id,
            ProductPatch {
                image_url: Some(None),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.image_url, None);
    }

    #[test]
    fn update_product_moves_category() {
        let connection = get_test_db_connection();
        let books = create_test_category("Books", &connection);
        let toys = create_test_category("Toys", &connection);
        let product = create_product(
            Product::build("Puzzle", "1000 pieces", price(2500)).category(books),
            &connection,
        )
        .unwrap();

        let updated = update_product(
            product.id,
            ProductPatch {
                category_id: Some(toys),
                ..Default::default()
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.category_id, Some(toys));
    }

    #[test]
    fn update_product_with_missing_category_changes_nothing() {
        let connection = get_test_db_connection();
        let books = create_test_category("Books", &connection);
        let product = create_product(
            Product::build("Novel", "A story", price(1200)).category(books),
            &connection,
        )
        .unwrap();

        let result = update_product(
            product.id,
            ProductPatch {
                name: Some("Renamed".to_owned()),
                price: Some(price(1)),
                category_id: Some(books + 100),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidCategory(books + 100)));
        assert_eq!(get_product(product.id, &connection), Ok(product));
    }

    #[test]
    fn update_product_with_invalid_id_fails() {
        let connection = get_test_db_connection();

        let result = update_product(
            999999,
            ProductPatch {
                name: Some("Updated".to_owned()),
                ..Default::default()
            },
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingProduct));
    }

    #[test]
    fn delete_product_succeeds() {
        let connection = get_test_db_connection();
        let product =
            create_product(Product::build("ToDelete", "", price(100)), &connection).unwrap();

        let result = delete_product(product.id, &connection);

        assert!(result.is_ok());
        assert_eq!(get_product(product.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_product_with_invalid_id_fails() {
        let connection = get_test_db_connection();

        let result = delete_product(999999, &connection);

        assert_eq!(result, Err(Error::DeleteMissingProduct));
    }

    #[test]
    fn deleting_category_keeps_its_products() {
        let connection = get_test_db_connection();
        let books = create_test_category("Books", &connection);
        let toys = create_test_category("Toys", &connection);
        let mut book_ids = Vec::new();
        for i in 0..4 {
            let product = create_product(
                Product::build(&format!("Book #{i}"), "", price(1000)).category(books),
                &connection,
            )
            .unwrap();
            book_ids.push(product.id);
        }
        let toy = create_product(
            Product::build("Yo-yo", "", price(300)).category(toys),
            &connection,
        )
        .unwrap();

        delete_category(books, &connection).expect("Could not delete category");

        assert_eq!(count_products(&connection), Ok(5));
        for id in book_ids {
            let product = get_product(id, &connection).unwrap();
            assert_eq!(product.category_id, None, "product {id} still has a category");
        }
        assert_eq!(get_product(toy.id, &connection).unwrap().category_id, Some(toys));
    }

    #[test]
    fn foreign_key_sets_category_to_null_on_delete() {
        let connection = get_test_db_connection();
        let books = create_test_category("Books", &connection);
        let product = create_product(
            Product::build("Atlas", "", price(4000)).category(books),
            &connection,
        )
        .unwrap();

        connection
            .execute("DELETE FROM category WHERE id = ?1", [books])
            .unwrap();

        assert_eq!(get_product(product.id, &connection).unwrap().category_id, None);
    }
}
