//! The API endpoints URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The analytics dashboard page.
pub const DASHBOARD_VIEW: &str = "/dashboard";

/// The GraphQL endpoint. GET serves the GraphiQL explorer, POST executes queries.
pub const GRAPHQL: &str = "/graphql";
/// The route for the full dashboard report.
pub const DASHBOARD_API: &str = "/api/dashboard";
/// The route for the number of products in each category.
pub const CATEGORY_COUNTS_API: &str = "/api/dashboard/category-counts";
/// The route for the in stock versus out of stock product counts.
pub const STOCK_DISTRIBUTION_API: &str = "/api/dashboard/stock-distribution";
