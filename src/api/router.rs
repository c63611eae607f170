use crate::api::handlers;
use crate::core::correlator::QueryCorrelator;
use axum::{routing::get, Router};

/// Build the axum router with all query endpoints.
pub fn build_router(correlator: QueryCorrelator) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/me", get(handlers::me))
        .route("/peers", get(handlers::peers))
        .route("/titles", get(handlers::list_titles))
        .route("/titles/:title_number", get(handlers::get_title))
        .route(
            "/titles/:title_number/sales-agreement",
            get(handlers::get_sales_agreement),
        )
        .route("/titles/:title_number/charges", get(handlers::get_charges))
        .route(
            "/titles/:title_number/restrictions",
            get(handlers::get_restrictions),
        )
        .with_state(correlator)
}
