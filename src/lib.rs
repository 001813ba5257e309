//! Catalog is a small e-commerce catalog service.
//!
//! It stores categories and products in SQLite, exposes them through a
//! GraphQL API, and serves an analytics dashboard that aggregates the
//! catalog into KPIs, top-N lists and chart data.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use rust_decimal::Decimal;
use serde_json::json;
use tokio::signal;

mod app_state;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod graphql;
mod html;
mod logging;
mod not_found;
mod product;
mod routing;

pub use app_state::{AppState, DbConnection};
pub use category::{
    Category, CategoryId, CategoryName, CategoryPatch, NewCategory, count_categories,
    create_category, delete_category, find_category, get_all_categories, get_category,
    update_category,
};
pub use dashboard::{
    CategoryCount, CategoryProductCount, DashboardReport, StockDistribution, compute_dashboard,
};
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use graphql::{CatalogSchema, build_schema};
pub use logging::{LOG_BODY_LENGTH_LIMIT, MAX_BODY_SIZE, logging_middleware};
pub use product::{
    Currency, Price, Product, ProductBuilder, ProductFilter, ProductId, ProductOrdering,
    ProductPatch, SortField, SortOrder, StockQuantity, count_products, create_product,
    delete_product, find_product, get_product, list_products, update_product,
};
pub use routing::build_router;

use crate::not_found::get_404_not_found_response;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error occurs when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used to create a product name.
    #[error("Product name cannot be empty")]
    EmptyProductName,

    /// The specified category name already exists in the database.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category ID used to create or update a product did not match a
    /// category in the database.
    #[error("category not found: no category with the ID {0}")]
    InvalidCategory(CategoryId),

    /// A price was negative, had more than two decimal places, or was too large.
    #[error("invalid price {0}: prices must be non-negative, below 100000000 and have at most two decimal places")]
    InvalidPrice(Decimal),

    /// A currency code was not made of exactly three letters.
    #[error("invalid currency code \"{0}\": expected a three letter code such as \"USD\"")]
    InvalidCurrency(String),

    /// A stock quantity was negative or too large.
    #[error("invalid stock quantity {0}: stock quantities must be non-negative")]
    InvalidStockQuantity(i64),

    /// The field name given to sort products by is not sortable.
    #[error("cannot order products by \"{0}\"")]
    InvalidSortField(String),

    /// A string could not be interpreted as a database ID.
    #[error("\"{0}\" is not a valid ID")]
    InvalidId(String),

    /// A pagination argument (limit or offset) was negative.
    #[error("{0} must not be negative")]
    NegativePagination(&'static str),

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a product that does not exist
    #[error("tried to update a product that is not in the database")]
    UpdateMissingProduct,

    /// Tried to delete a product that does not exist
    #[error("tried to delete a product that is not in the database")]
    DeleteMissingProduct,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A response body could not be read.
    #[error("could not read the message body")]
    BodyReadError,

    /// A request body could not be read or was larger than the limit.
    #[error("the request body could not be read or is larger than {0} bytes")]
    InvalidRequestBody(usize),

    /// An aggregate over the catalog does not fit in a decimal.
    #[error("the {0} is too large to represent")]
    AggregateOverflow(&'static str),
}

/// The message shown to clients in place of the details of internal errors.
pub(crate) const INTERNAL_ERROR_MESSAGE: &str =
    "An unexpected error occurred, check the server logs for more details.";

/// The broad classes of [Error] that callers need to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An ID referenced by a mutation does not exist.
    NotFound,
    /// A write would break a uniqueness constraint.
    Conflict,
    /// An argument was malformed or out of range.
    InvalidArgument,
    /// The storage layer failed.
    Internal,
}

impl ErrorKind {
    /// The machine readable code used in API responses.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Error {
    /// Which class of error this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound
            | Error::InvalidCategory(_)
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingProduct
            | Error::DeleteMissingProduct => ErrorKind::NotFound,
            Error::DuplicateCategoryName(_) => ErrorKind::Conflict,
            Error::EmptyCategoryName
            | Error::EmptyProductName
            | Error::InvalidPrice(_)
            | Error::InvalidCurrency(_)
            | Error::InvalidStockQuantity(_)
            | Error::InvalidSortField(_)
            | Error::InvalidId(_)
            | Error::NegativePagination(_)
            | Error::InvalidRequestBody(_) => ErrorKind::InvalidArgument,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::BodyReadError
            | Error::AggregateOverflow(_) => ErrorKind::Internal,
        }
    }

    /// The message that is safe to show to API clients.
    ///
    /// Internal errors are replaced with a generic message, the details
    /// should only be logged on the server.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => INTERNAL_ERROR_MESSAGE.to_owned(),
            _ => self.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();

        match kind {
            ErrorKind::NotFound if matches!(self, Error::NotFound) => get_404_not_found_response(),
            ErrorKind::Internal => {
                tracing::error!("An unexpected error occurred: {}", self);
                error_json(kind, &self.public_message())
            }
            _ => error_json(kind, &self.public_message()),
        }
    }
}

fn error_json(kind: ErrorKind, message: &str) -> Response {
    (
        kind.status_code(),
        Json(json!({ "error": message, "code": kind.code() })),
    )
        .into_response()
}

#[cfg(test)]
mod error_tests {
    use rusqlite::Connection;

    use crate::{Error, ErrorKind};

    #[test]
    fn no_rows_maps_to_not_found() {
        let connection = Connection::open_in_memory().unwrap();

        let error: Error = connection
            .query_row("SELECT 1 WHERE 0", [], |row| row.get::<_, i64>(0))
            .unwrap_err()
            .into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn kinds_group_errors() {
        assert_eq!(Error::InvalidCategory(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::DuplicateCategoryName("Books".to_owned()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            Error::InvalidSortField("password".to_owned()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(Error::DatabaseLockError.kind(), ErrorKind::Internal);
        assert_eq!(
            Error::InvalidRequestBody(1024).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            Error::AggregateOverflow("total stock value").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert!(!error.public_message().contains("SQL"));
    }
}
