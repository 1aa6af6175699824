//! Application assembly: services, router and middleware chain.
//!
//! As seen by an incoming request the chain runs favicon, compression,
//! request id / tracing / panic catcher, CORS, API token guard, proxy-aware
//! https redirect, static files, body limit and finally the routes. Any GET
//! outside `/api` that nothing else answered gets the client shell.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::{Modify, OpenApi};

use crate::core::config::{AppConfig, ClientConfig, LeanCloudConfig, SwaggerConfig, WebhookConfig};
use crate::core::error::{AppError, Result};
use crate::core::middleware::{self, ProxySettings};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::client_shell::{handler as shell_handler, ClientShell};
use crate::features::rules::{routes as rules_routes, TriggerService};
use crate::features::webhooks::{routes as webhooks_routes, WebhookRegistry};
use crate::modules::datastore::Db;

/// Long-lived services shared by the router and the startup jobs
#[derive(Clone)]
pub struct AppState {
    pub categories: Arc<CategoryService>,
    pub webhooks: Arc<WebhookRegistry>,
    pub triggers: Arc<TriggerService>,
    pub shell: Arc<ClientShell>,
}

impl AppState {
    pub fn new(
        db: Db,
        client: &ClientConfig,
        leancloud: &LeanCloudConfig,
        webhook: &WebhookConfig,
    ) -> Result<Self> {
        let webhooks = Arc::new(WebhookRegistry::new(db.clone(), webhook)?);
        let categories = Arc::new(CategoryService::new(db.clone(), Arc::clone(&webhooks)));
        let triggers = Arc::new(TriggerService::new(db));
        let shell = ClientShell::new(client, leancloud)
            .map_err(|e| AppError::Internal(format!("Failed to render client shell: {}", e)))?;

        Ok(Self {
            categories,
            webhooks,
            triggers,
            shell: Arc::new(shell),
        })
    }
}

/// Webhook refresh and trigger validation; outcomes are only logged
pub fn spawn_startup_jobs(state: &AppState) {
    let webhooks = Arc::clone(&state.webhooks);
    tokio::spawn(async move {
        match webhooks.refresh().await {
            Ok(count) => tracing::info!("webhooks refreshed ({} registered)", count),
            Err(e) => tracing::error!("Failed to refresh webhooks: {}", e),
        }
    });

    let triggers = Arc::clone(&state.triggers);
    tokio::spawn(async move {
        match triggers.validate_all().await {
            Ok(summary) => tracing::info!(
                "triggers validated (success: {}, fail: {})",
                summary.success,
                summary.fail
            ),
            Err(e) => tracing::error!("Failed to validate triggers: {}", e),
        }
    });
}

fn docs_routes(swagger: &SwaggerConfig) -> Router {
    let swagger_modifier = SwaggerInfoModifier {
        title: swagger.title.clone(),
        version: swagger.version.clone(),
        description: swagger.description.clone(),
    };
    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let docs = Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let openapi = openapi.clone();
            async move { Json(openapi) }
        }),
    );

    match swagger.credentials() {
        Some(credentials) => {
            tracing::info!("API docs basic auth enabled");
            docs.layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
        }
        None => {
            tracing::info!("API docs basic auth disabled (no credentials configured)");
            docs
        }
    }
}

pub fn build_app(state: &AppState, app: &AppConfig, swagger: &SwaggerConfig) -> Router {
    let shell_fallback = Router::new()
        .fallback(shell_handler::fallback)
        .with_state(Arc::clone(&state.shell));

    let routes = Router::new()
        .merge(categories_routes::routes(Arc::clone(&state.categories)))
        .merge(webhooks_routes::routes(Arc::clone(&state.webhooks)))
        .merge(rules_routes::routes(Arc::clone(&state.triggers)))
        .merge(docs_routes(swagger))
        .merge(shell_fallback)
        .layer(DefaultBodyLimit::max(app.max_request_body_size))
        .layer(from_fn_with_state(
            ServeDir::new(&app.public_dir),
            middleware::static_files_middleware,
        ))
        .layer(from_fn_with_state(
            ProxySettings {
                trust_proxy: app.trust_proxy,
                https_redirect: app.https_redirect,
            },
            middleware::https_redirect_middleware,
        ));

    let routes = match &app.api_token {
        Some(token) => {
            tracing::info!("API token guard enabled");
            routes.layer(from_fn_with_state(
                Arc::new(token.clone()),
                middleware::api_token_middleware,
            ))
        }
        None => routes,
    };

    if app.crash_report_dsn.is_some() {
        tracing::info!("Crash reporting DSN configured; panics are reported through the error log");
    }

    routes
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(middleware::cors_layer(app.cors_allowed_origins.clone()))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
        .layer(CompressionLayer::new())
        .route_service(
            "/favicon.ico",
            ServeFile::new(Path::new(&app.public_dir).join("favicon.ico")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::datastore::MemoryStore;
    use crate::shared::test_helpers::{seed_category, test_db};
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn swagger() -> SwaggerConfig {
        SwaggerConfig {
            username: None,
            password: None,
            title: "Helpdesk API".to_string(),
            version: "0.1.0".to_string(),
            description: "test".to_string(),
        }
    }

    fn client() -> ClientConfig {
        ClientConfig {
            org_name: "Acme".to_string(),
            ..Default::default()
        }
    }

    fn test_server_with(store: Arc<MemoryStore>, app: AppConfig) -> TestServer {
        let state = AppState::new(
            test_db(store),
            &client(),
            &LeanCloudConfig::default(),
            &WebhookConfig::default(),
        )
        .unwrap();
        TestServer::new(build_app(&state, &app, &swagger())).unwrap()
    }

    fn test_server(store: Arc<MemoryStore>) -> TestServer {
        test_server_with(store, AppConfig::default())
    }

    #[tokio::test]
    async fn test_client_routes_get_shell() {
        let server = test_server(Arc::new(MemoryStore::new()));

        let response = server.get("/settings/categories").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let html = response.text();
        assert!(html.contains("Object.assign(window,"));
        assert!(html.contains(r#""ORG_NAME":"Acme""#));
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_json_404() {
        let server = test_server(Arc::new(MemoryStore::new()));

        let response = server.get("/api/nothing-here").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("/api/nothing-here"));
    }

    #[tokio::test]
    async fn test_category_create_update_disable_flow() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "root", "Root", None, Some(1)).await;
        let server = test_server(store);

        let response = server
            .post("/api/categories")
            .json(&json!({
                "name": "Refunds",
                "description": "Money back",
                "qTemplate": "Order:",
                "FAQs": "f1,,f2",
                "parentId": "root"
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["redirectTo"], "/settings/categories");
        assert_eq!(body["message"], "Category created");
        let id = body["data"]["category"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["category"]["FAQs"], json!(["f1", "f2"]));

        // Moving the root under its own child is rejected
        let response = server
            .put("/api/categories/root")
            .json(&json!({ "name": "Root", "parentId": id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server.get(&format!("/api/categories/{}/form", id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let form: Value = response.json();
        assert_eq!(form["data"]["FAQs"], "f1,f2");
        assert_eq!(form["data"]["parentId"], "root");

        let response = server
            .put(&format!("/api/categories/{}", id))
            .json(&json!({ "name": "Refunds", "description": "Money back", "parentId": null }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["category"]["parentId"], Value::Null);

        let response = server
            .post(&format!("/api/categories/{}/disable", id))
            .json(&json!({}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let response = server
            .post(&format!("/api/categories/{}/disable", id))
            .json(&json!({ "confirm": true }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["data"]["category"]["disabled"], true);

        let response = server.get("/api/categories").await;
        let body: Value = response.json();
        assert_eq!(body["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_create_accepts_url_encoded_form() {
        let server = test_server(Arc::new(MemoryStore::new()));

        let response = server
            .post("/api/categories")
            .form(&[("name", "Shipping"), ("FAQs", "f9")])
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["data"]["category"]["name"], "Shipping");
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let server = test_server(Arc::new(MemoryStore::new()));

        let response = server
            .post("/api/categories")
            .json(&json!({ "name": "   " }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_api_token_guards_api_only() {
        let app = AppConfig {
            api_token: Some("secret".to_string()),
            ..AppConfig::default()
        };
        let server = test_server_with(Arc::new(MemoryStore::new()), app);

        let response = server.get("/api/categories").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/categories")
            .authorization_bearer("secret")
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let response = server.get("/tickets/1").await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_plain_http_behind_proxy_is_redirected() {
        let app = AppConfig {
            https_redirect: true,
            ..AppConfig::default()
        };
        let server = test_server_with(Arc::new(MemoryStore::new()), app);

        let response = server
            .get("/settings/categories?x=1")
            .add_header(
                HeaderName::from_static("x-forwarded-proto"),
                HeaderValue::from_static("http"),
            )
            .add_header(
                HeaderName::from_static("x-forwarded-host"),
                HeaderValue::from_static("help.example.com"),
            )
            .await;
        assert_eq!(response.status_code(), StatusCode::FOUND);
        assert_eq!(
            response.header("location").to_str().unwrap(),
            "https://help.example.com/settings/categories?x=1"
        );
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let server = test_server(Arc::new(MemoryStore::new()));

        let response = server.get("/api-docs/openapi.json").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: Value = response.json();
        assert!(body["paths"]["/api/categories"].is_object());
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let server = test_server(Arc::new(MemoryStore::new()));
        let response = server.get("/api/categories").await;
        assert!(response.headers().contains_key("x-request-id"));
    }
}
