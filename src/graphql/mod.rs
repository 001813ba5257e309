//! The GraphQL API for querying and changing the catalog.
//!
//! Resolvers lock the shared database connection for the duration of one
//! synchronous call and never hold the lock across an `.await`.

use async_graphql::{
    Context, EmptySubscription, ErrorExtensions, Schema, http::GraphiQLSource,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use rusqlite::Connection;

use crate::{DbConnection, Error, ErrorKind, INTERNAL_ERROR_MESSAGE, endpoints};

mod mutation;
mod query;
mod types;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

/// The schema served at [endpoints::GRAPHQL].
pub type CatalogSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema over the catalog stored in `db_connection`.
pub fn build_schema(db_connection: DbConnection) -> CatalogSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db_connection)
        .finish()
}

/// Execute a GraphQL request.
pub async fn graphql_handler(
    State(schema): State<CatalogSchema>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(request.into_inner()).await.into()
}

/// Serve the GraphiQL explorer.
pub async fn get_graphiql_page() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(endpoints::GRAPHQL).finish())
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        let kind = self.kind();

        if kind == ErrorKind::Internal {
            tracing::error!("An unexpected error occurred: {self}");
        }

        async_graphql::Error::new(self.public_message())
            .extend_with(|_, extensions| extensions.set("code", kind.code()))
    }
}

/// A GraphQL error for failures that clients cannot do anything about.
pub(crate) fn internal_error() -> async_graphql::Error {
    async_graphql::Error::new(INTERNAL_ERROR_MESSAGE)
        .extend_with(|_, extensions| extensions.set("code", ErrorKind::Internal.code()))
}

/// Run `f` with the locked database connection from the schema data.
///
/// Domain errors are converted to GraphQL errors with an `extensions.code`.
pub(crate) fn with_connection<T>(
    ctx: &Context<'_>,
    f: impl FnOnce(&Connection) -> Result<T, Error>,
) -> async_graphql::Result<T> {
    let db_connection = ctx.data::<DbConnection>()?;
    let connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError.extend())?;

    f(&connection).map_err(|error| error.extend())
}
