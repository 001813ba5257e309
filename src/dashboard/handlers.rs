//! Dashboard HTTP handlers and view rendering.
//!
//! This module contains:
//! - Route handlers for the dashboard page and the JSON report endpoints
//! - HTML view functions for rendering the dashboard UI
//! - The state used by the handlers

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use std::sync::MutexGuard;

use crate::{
    AppState, DbConnection, Error,
    dashboard::{
        charts::{
            DashboardChart, category_counts_chart, charts_script, charts_view,
            stock_distribution_chart,
        },
        report::{
            CategoryCount, CategoryProductCount, DashboardReport, StockDistribution,
            compute_dashboard, get_category_counts, get_stock_distribution,
        },
    },
    html::{
        ECHARTS_SCRIPT, HeadElement, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, format_amount, format_price,
    },
    product::Product,
};

/// The state needed for the dashboard page and report endpoints.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the catalog.
    pub db_connection: DbConnection,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl DashboardState {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }
}

/// Display a page with KPIs, top-N tables and charts for the catalog.
pub async fn get_dashboard_page(State(state): State<DashboardState>) -> Result<Response, Error> {
    let report = compute_dashboard(&*state.lock()?)
        .inspect_err(|error| tracing::error!("could not compute dashboard: {error}"))?;

    Ok(dashboard_view(&report).into_response())
}

/// Get the full dashboard report as JSON.
pub async fn get_dashboard_report(
    State(state): State<DashboardState>,
) -> Result<Json<DashboardReport>, Error> {
    compute_dashboard(&*state.lock()?).map(Json)
}

/// Get the number of products in every category as a flat JSON list.
pub async fn get_category_counts_endpoint(
    State(state): State<DashboardState>,
) -> Result<Json<Vec<CategoryCount>>, Error> {
    get_category_counts(&*state.lock()?).map(Json)
}

/// Get the in stock and out of stock product counts as a flat JSON object.
pub async fn get_stock_distribution_endpoint(
    State(state): State<DashboardState>,
) -> Result<Json<StockDistribution>, Error> {
    get_stock_distribution(&*state.lock()?).map(Json)
}

fn build_dashboard_charts(report: &DashboardReport) -> [DashboardChart; 2] {
    [
        DashboardChart {
            id: "category-counts-chart",
            options: category_counts_chart(&report.category_product_counts).to_string(),
        },
        DashboardChart {
            id: "stock-distribution-chart",
            options: stock_distribution_chart(report.stock_distribution).to_string(),
        },
    ]
}

fn dashboard_view(report: &DashboardReport) -> Markup {
    let charts = build_dashboard_charts(report);

    let content = html!(
        div
            id="dashboard-content"
            class=(PAGE_CONTAINER_STYLE)
        {
            h2 class="text-2xl font-bold mb-6" { "Catalog Dashboard" }

            (kpi_cards_view(report))

            @if report.total_products == 0 {
                p class="mb-8"
                {
                    "Nothing here yet... Charts and tables will show up here once
                    products are added to the catalog."
                }
            } @else {
                (charts_view(&charts))

                div class="grid grid-cols-1 xl:grid-cols-2 gap-4 w-full"
                {
                    (product_table("Most Expensive", "top-expensive", &report.top_expensive_products))
                    (product_table("Most Stocked", "top-stocked", &report.top_stocked_products))
                    (product_table("Low Stock", "low-stock", &report.low_stock_products))
                    (top_categories_table(&report.categories_with_product_counts))
                }
            }
        }
    );

    let scripts = [
        HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}

fn kpi_cards_view(report: &DashboardReport) -> Markup {
    let cards = [
        ("Products", report.total_products.to_string()),
        ("In Stock", report.products_in_stock.to_string()),
        ("Out of Stock", report.products_out_of_stock.to_string()),
        ("Categories", report.total_categories.to_string()),
        ("Average Price", format_amount(report.average_product_price)),
        ("Stock Value", format_amount(report.total_stock_value)),
    ];

    html!(
        section
            id="kpis"
            class="grid grid-cols-2 md:grid-cols-3 xl:grid-cols-6 gap-4 w-full mb-8"
        {
            @for (label, value) in cards {
                div
                    class="kpi bg-white dark:bg-gray-800 border border-gray-200
                        dark:border-gray-700 rounded-lg p-4 shadow-md"
                {
                    p class="text-sm text-gray-600 dark:text-gray-400" { (label) }
                    p class="text-2xl font-semibold" { (value) }
                }
            }
        }
    )
}

fn product_table(title: &str, id: &str, products: &[Product]) -> Markup {
    html!(
        div id=(id)
        {
            h3 class="text-xl font-semibold mb-4" { (title) }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Price" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Stock" }
                        }
                    }

                    tbody
                    {
                        @for product in products {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                th scope="row" class=(TABLE_CELL_STYLE) { (product.name) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (format_price(product.price.amount(), &product.currency))
                                }
                                td class=(TABLE_CELL_STYLE) { (product.stock_quantity.get()) }
                            }
                        }

                        @if products.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="3" class=(TABLE_CELL_STYLE) { "No products" }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn top_categories_table(categories: &[CategoryProductCount]) -> Markup {
    html!(
        div id="top-categories"
        {
            h3 class="text-xl font-semibold mb-4" { "Largest Categories" }

            div class="overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Products" }
                        }
                    }

                    tbody
                    {
                        @for entry in categories {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                th scope="row" class=(TABLE_CELL_STYLE) { (entry.category.name) }
                                td class=(TABLE_CELL_STYLE) { (entry.product_count) }
                            }
                        }

                        @if categories.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="2" class=(TABLE_CELL_STYLE) { "No categories" }
                            }
                        }
                    }
                }
            }
        }
    )
}
