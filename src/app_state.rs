//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{
    Error,
    db::initialize,
    graphql::{CatalogSchema, build_schema},
};

/// The shared handle to the catalog database.
pub type DbConnection = Arc<Mutex<Connection>>;

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: DbConnection,

    /// The GraphQL schema, which holds its own handle to the database.
    pub schema: CatalogSchema,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            schema: build_schema(connection.clone()),
            db_connection: connection,
        })
    }
}

impl FromRef<AppState> for CatalogSchema {
    fn from_ref(state: &AppState) -> Self {
        state.schema.clone()
    }
}
