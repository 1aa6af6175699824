//! Server-rendered HTML shell for the single-page client.
//!
//! The page is rendered once at startup; runtime configuration is embedded
//! as a JSON object merged into `window`.

use minijinja::{context, AutoEscape, Environment};
use serde::Serialize;
use thiserror::Error;

use crate::core::config::{ClientConfig, LeanCloudConfig};

const TEMPLATE_NAME: &str = "client_shell/index.html.jinja";
const TEMPLATE_SOURCE: &str = include_str!("../../../templates/client_shell/index.html.jinja");
const DEFAULT_TITLE: &str = "LeanTicket";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Failed to render template: {0}")]
    RenderError(String),
}

/// Globals the client reads from `window`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ClientGlobals {
    pub leancloud_app_id: String,
    pub leancloud_app_key: String,
    pub leancloud_api_host: String,
    pub lean_cli_have_staging: String,
    pub sentry_dsn_public: String,
    pub org_name: String,
    pub use_oauth: bool,
    pub algolia_api_key: String,
    pub faq_views: String,
}

impl ClientGlobals {
    /// Only the public app key is exposed; the master key never leaves the server
    pub fn new(client: &ClientConfig, datastore: &LeanCloudConfig) -> Self {
        Self {
            leancloud_app_id: datastore.app_id.clone(),
            leancloud_app_key: datastore.app_key.clone(),
            leancloud_api_host: datastore.server_url.clone(),
            lean_cli_have_staging: client.lean_cli_have_staging.clone(),
            sentry_dsn_public: client.sentry_dsn_public.clone(),
            org_name: client.org_name.clone(),
            use_oauth: client.use_oauth,
            algolia_api_key: client.algolia_api_key.clone(),
            faq_views: client.faq_views.clone(),
        }
    }
}

/// JSON safe to place inside an inline `<script>` element
pub fn script_safe_json<T: Serialize>(value: &T) -> Result<String, TemplateError> {
    let json = serde_json::to_string(value)
        .map_err(|e| TemplateError::RenderError(format!("Failed to encode globals: {}", e)))?;

    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(ch),
        }
    }
    Ok(escaped)
}

/// Pre-rendered index page
#[derive(Debug, Clone)]
pub struct ClientShell {
    html: String,
}

impl ClientShell {
    pub fn new(client: &ClientConfig, datastore: &LeanCloudConfig) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template(TEMPLATE_NAME, TEMPLATE_SOURCE)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;

        let template = env
            .get_template(TEMPLATE_NAME)
            .map_err(|_| TemplateError::NotFound(TEMPLATE_NAME.to_string()))?;

        let globals = script_safe_json(&ClientGlobals::new(client, datastore))?;
        let title = if client.org_name.is_empty() {
            DEFAULT_TITLE
        } else {
            client.org_name.as_str()
        };

        let html = template
            .render(context! {
                title => title,
                asset_prefix => client.webpack_dev_server.trim_end_matches('/'),
                globals => globals,
            })
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;

        tracing::debug!("Rendered client shell ({} bytes)", html.len());
        Ok(Self { html })
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}
