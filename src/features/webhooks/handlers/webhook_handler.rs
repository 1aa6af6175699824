use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::webhooks::dtos::{RefreshWebhooksResponseDto, WebhookResponseDto};
use crate::features::webhooks::services::WebhookRegistry;
use crate::shared::types::{ApiResponse, Meta};

/// List the registered webhooks
#[utoipa::path(
    get,
    path = "/api/webhooks",
    responses(
        (status = 200, description = "Registered webhooks", body = ApiResponse<Vec<WebhookResponseDto>>),
    ),
    tag = "webhooks"
)]
pub async fn list_webhooks(
    State(registry): State<Arc<WebhookRegistry>>,
) -> Result<Json<ApiResponse<Vec<WebhookResponseDto>>>> {
    let hooks = registry.webhooks().await;
    let items: Vec<WebhookResponseDto> = hooks.iter().map(WebhookResponseDto::from).collect();
    let total = items.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Reload webhooks from the datastore
#[utoipa::path(
    post,
    path = "/api/webhooks/refresh",
    responses(
        (status = 200, description = "Webhooks reloaded", body = ApiResponse<RefreshWebhooksResponseDto>),
        (status = 502, description = "Datastore unavailable")
    ),
    tag = "webhooks"
)]
pub async fn refresh_webhooks(
    State(registry): State<Arc<WebhookRegistry>>,
) -> Result<Json<ApiResponse<RefreshWebhooksResponseDto>>> {
    let registered = registry.refresh().await?;
    tracing::info!("webhooks refreshed ({} registered)", registered);
    Ok(Json(ApiResponse::success(
        Some(RefreshWebhooksResponseDto { registered }),
        Some("Webhooks refreshed".to_string()),
        None,
    )))
}
