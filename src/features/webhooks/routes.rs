use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::webhooks::handlers;
use crate::features::webhooks::services::WebhookRegistry;

pub fn routes(registry: Arc<WebhookRegistry>) -> Router {
    Router::new()
        .route("/api/webhooks", get(handlers::list_webhooks))
        .route("/api/webhooks/refresh", post(handlers::refresh_webhooks))
        .with_state(registry)
}
