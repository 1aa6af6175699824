use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/api/categories/parent-check", post(handlers::check_parent))
        .route(
            "/api/categories/{id}",
            get(handlers::get_category).put(handlers::update_category),
        )
        .route("/api/categories/{id}/form", get(handlers::get_category_form))
        .route("/api/categories/{id}/disable", post(handlers::disable_category))
        .with_state(service)
}
