//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, CategoryPatch, NewCategory},
};

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if a category with the same name already exists.
pub fn create_category(category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    connection
        .execute(
            "INSERT INTO category (name, description) VALUES (?1, ?2);",
            (category.name.as_ref(), &category.description),
        )
        .map_err(|error| map_unique_name_error(error, &category.name))?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: category.name,
        description: category.description,
    })
}

/// Retrieve a single category by ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no category with the ID `category_id`.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, description FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve a single category by ID, or `None` if it does not exist.
pub fn find_category(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare("SELECT id, name, description FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Retrieve all categories in the order they were created.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, description FROM category ORDER BY id ASC;")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Count the categories in the catalog.
pub fn count_categories(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(*) FROM category;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Apply `patch` to the category with the ID `category_id` and return the updated category.
///
/// # Errors
/// Returns:
/// - [Error::UpdateMissingCategory] if the category does not exist,
/// - [Error::DuplicateCategoryName] if the new name is used by another category.
pub fn update_category(
    category_id: CategoryId,
    patch: CategoryPatch,
    connection: &Connection,
) -> Result<Category, Error> {
    let transaction = connection.unchecked_transaction()?;

    let mut category = match get_category(category_id, &transaction) {
        Ok(category) => category,
        Err(Error::NotFound) => return Err(Error::UpdateMissingCategory),
        Err(error) => return Err(error),
    };

    if patch.is_empty() {
        return Ok(category);
    }

    if let Some(name) = patch.name {
        category.name = name;
    }

    if let Some(description) = patch.description {
        category.description = description;
    }

    transaction
        .execute(
            "UPDATE category SET name = ?1, description = ?2 WHERE id = ?3;",
            (category.name.as_ref(), &category.description, category_id),
        )
        .map_err(|error| map_unique_name_error(error, &category.name))?;

    transaction.commit()?;

    Ok(category)
}

/// Delete a category by ID.
///
/// Products in the category are kept, their category is set to null in the
/// same transaction as the delete.
///
/// # Errors
/// Returns [Error::DeleteMissingCategory] if the category doesn't exist.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    let orphaned_products = transaction.execute(
        "UPDATE product SET category_id = NULL WHERE category_id = ?1;",
        [category_id],
    )?;

    let rows_affected = transaction.execute("DELETE FROM category WHERE id = ?1;", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    transaction.commit()?;

    tracing::debug!(
        "Deleted category {category_id}, {orphaned_products} products no longer have a category"
    );

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

fn map_unique_name_error(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == 2067 && desc.ends_with("category.name") =>
        {
            Error::DuplicateCategoryName(name.to_string())
        }
        error => error.into(),
    }
}

pub(crate) fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);
    let description = row.get(2)?;

    Ok(Category {
        id,
        name,
        description,
    })
}
