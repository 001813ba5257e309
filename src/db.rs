//! Database initialization for the catalog.

use rusqlite::{Connection, Transaction, TransactionBehavior, functions::FunctionFlags};

use crate::{category::create_category_table, product::create_product_table};

/// The name of the SQL function that lowercases text with full Unicode case folding.
///
/// SQLite's built-in `lower()` only folds ASCII letters.
pub(crate) const UNICODE_LOWER: &str = "unicode_lower";

/// Create the catalog tables, enable foreign key enforcement and register
/// the catalog's SQL functions on `connection`.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
/// Returns an error if the pragma cannot be set, a function cannot be
/// registered or a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    // Foreign keys are off by default in SQLite and the pragma is a no-op
    // inside a transaction.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    connection.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text = context.get::<Option<String>>(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_category_table(&transaction)?;
    create_product_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
