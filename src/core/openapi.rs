use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::rules::{dtos as rules_dtos, handlers as rules_handlers};
use crate::features::webhooks::{dtos as webhooks_dtos, handlers as webhooks_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::get_category_form,
        categories_handlers::check_parent,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::disable_category,
        // Webhooks
        webhooks_handlers::list_webhooks,
        webhooks_handlers::refresh_webhooks,
        // Triggers
        rules_handlers::validate_triggers,
    ),
    components(
        schemas(
            Meta,
            // Categories
            categories_dtos::CategoryResponseDto,
            categories_dtos::CategoryTreeDto,
            categories_dtos::CategoryFormDto,
            categories_dtos::ParentCheckRequestDto,
            categories_dtos::ParentCheckResponseDto,
            categories_dtos::DisableCategoryRequestDto,
            categories_dtos::CategoryMutationDto,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryFormDto>,
            ApiResponse<categories_dtos::ParentCheckResponseDto>,
            ApiResponse<categories_dtos::CategoryMutationDto>,
            // Webhooks
            webhooks_dtos::WebhookResponseDto,
            webhooks_dtos::RefreshWebhooksResponseDto,
            ApiResponse<Vec<webhooks_dtos::WebhookResponseDto>>,
            ApiResponse<webhooks_dtos::RefreshWebhooksResponseDto>,
            // Triggers
            rules_dtos::TriggerValidationDto,
            rules_dtos::InvalidTriggerDto,
            ApiResponse<rules_dtos::TriggerValidationDto>,
        )
    ),
    tags(
        (name = "categories", description = "Ticket category administration"),
        (name = "webhooks", description = "Outgoing webhook registry"),
        (name = "triggers", description = "Ticket automation trigger validation"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Helpdesk API",
        version = "0.1.0",
        description = "Category administration API for the help desk",
    )
)]
pub struct ApiDoc;

/// Adds the API bearer token scheme to the OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
