use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any as CorsAny, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::services::ServeDir;
use tracing::Span;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::shared::constants::API_PREFIX;

/// Whether a path belongs to the JSON API
pub fn is_api_path(path: &str) -> bool {
    path == API_PREFIX
        || path
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(CorsAny)
        .allow_headers(CorsAny);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(CorsAny)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Turn a handler panic into a 500 envelope; the panic itself goes to the error log
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    AppError::Internal(format!("Request handler panicked: {}", detail)).into_response()
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"API docs\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

/// Require `Authorization: Bearer <token>` on API routes
///
/// Everything outside the API prefix (shell, static files) stays public.
pub async fn api_token_middleware(
    State(token): State<Arc<String>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_api_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let provided = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    if provided != token.as_str() {
        return Err(AppError::Unauthorized("Invalid API token".to_string()));
    }

    Ok(next.run(req).await)
}

/// How far to trust the fronting proxy
#[derive(Debug, Clone, Copy)]
pub struct ProxySettings {
    pub trust_proxy: bool,
    pub https_redirect: bool,
}

/// Scheme and host the client used, as seen through a trusted proxy
fn forwarded_origin(headers: &HeaderMap, trust_proxy: bool) -> (Option<String>, Option<String>) {
    let first = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let host = first(header::HOST.as_str());
    if !trust_proxy {
        return (None, host);
    }
    (
        first("x-forwarded-proto").map(|p| p.to_ascii_lowercase()),
        first("x-forwarded-host").or(host),
    )
}

/// Redirect plain-http requests arriving through the proxy to https
pub async fn https_redirect_middleware(
    State(settings): State<ProxySettings>,
    req: Request,
    next: Next,
) -> Response {
    if !settings.https_redirect {
        return next.run(req).await;
    }

    let (proto, host) = forwarded_origin(req.headers(), settings.trust_proxy);
    if let (Some("http"), Some(host)) = (proto.as_deref(), host) {
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = format!("https://{}{}", host, path);
        if let Ok(location) = HeaderValue::from_str(&location) {
            return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
        }
    }

    next.run(req).await
}

/// Answer GET/HEAD from the public directory when a file matches
///
/// Misses fall through to the rest of the stack untouched.
pub async fn static_files_middleware(
    State(files): State<ServeDir>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    if !(method == Method::GET || method == Method::HEAD) || is_api_path(req.uri().path()) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let probe = Request::from_parts(parts.clone(), Body::empty());
    match files.oneshot(probe).await {
        Ok(response) if response.status().is_success() || response.status().is_redirection() => {
            response.map(Body::new)
        }
        _ => next.run(Request::from_parts(parts, body)).await,
    }
}
