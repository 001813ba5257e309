//! Dashboard module
//!
//! Aggregates the catalog into KPIs, top-N lists and chart data, and serves
//! them as an HTML overview page and as JSON.

mod charts;
mod handlers;
mod report;

pub use handlers::{
    get_category_counts_endpoint, get_dashboard_page, get_dashboard_report,
    get_stock_distribution_endpoint,
};
pub use report::{
    CategoryCount, CategoryProductCount, DashboardReport, StockDistribution, compute_dashboard,
};
