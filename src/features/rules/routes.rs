use std::sync::Arc;

use axum::{routing::post, Router};

use crate::features::rules::handlers;
use crate::features::rules::services::TriggerService;

pub fn routes(service: Arc<TriggerService>) -> Router {
    Router::new()
        .route("/api/triggers/validate", post(handlers::validate_triggers))
        .with_state(service)
}
