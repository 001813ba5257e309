//! Application router configuration.

use axum::{Router, middleware, response::Redirect, routing::get};

use crate::{
    AppState,
    dashboard::{
        get_category_counts_endpoint, get_dashboard_page, get_dashboard_report,
        get_stock_distribution_endpoint,
    },
    endpoints,
    graphql::{get_graphiql_page, graphql_handler},
    logging::logging_middleware,
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::DASHBOARD_API, get(get_dashboard_report))
        .route(
            endpoints::CATEGORY_COUNTS_API,
            get(get_category_counts_endpoint),
        )
        .route(
            endpoints::STOCK_DISTRIBUTION_API,
            get(get_stock_distribution_endpoint),
        )
        .route(
            endpoints::GRAPHQL,
            get(get_graphiql_page).post(graphql_handler),
        )
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_dashboard() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::DASHBOARD_VIEW);
    }
}
