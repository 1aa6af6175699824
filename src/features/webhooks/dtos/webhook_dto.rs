use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::webhooks::models::Webhook;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponseDto {
    pub id: String,
    pub url: String,
    pub events: Vec<String>,
    /// Whether deliveries carry a signature header; the secret itself is never returned
    pub signed: bool,
}

impl From<&Webhook> for WebhookResponseDto {
    fn from(hook: &Webhook) -> Self {
        Self {
            id: hook.id.clone(),
            url: hook.url.to_string(),
            events: hook.events.clone(),
            signed: hook.secret.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshWebhooksResponseDto {
    pub registered: usize,
}
