use std::sync::Arc;

use axum::{extract::State, Json};

use crate::core::error::Result;
use crate::features::rules::dtos::TriggerValidationDto;
use crate::features::rules::services::TriggerService;
use crate::shared::types::ApiResponse;

/// Validate active triggers and deactivate the invalid ones
#[utoipa::path(
    post,
    path = "/api/triggers/validate",
    responses(
        (status = 200, description = "Validation tally", body = ApiResponse<TriggerValidationDto>),
        (status = 502, description = "Datastore unavailable")
    ),
    tag = "triggers"
)]
pub async fn validate_triggers(
    State(service): State<Arc<TriggerService>>,
) -> Result<Json<ApiResponse<TriggerValidationDto>>> {
    let summary = service.validate_all().await?;
    tracing::info!(
        "triggers validated (success: {}, fail: {})",
        summary.success,
        summary.fail
    );
    Ok(Json(ApiResponse::success(Some(summary), None, None)))
}
