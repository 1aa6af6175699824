use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tally of a validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TriggerValidationDto {
    pub success: usize,
    pub fail: usize,
    /// Triggers deactivated by this pass
    pub invalid: Vec<InvalidTriggerDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidTriggerDto {
    pub id: String,
    pub title: String,
    pub reason: String,
}
