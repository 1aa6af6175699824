use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, Uri},
    response::{Html, IntoResponse, Response},
};

use crate::core::error::AppError;
use crate::core::middleware::is_api_path;
use crate::features::client_shell::ClientShell;

/// Catch-all for unmatched requests
///
/// Client-side routes (any GET/HEAD outside `/api`) get the shell page;
/// everything else is a JSON 404.
pub async fn fallback(
    State(shell): State<Arc<ClientShell>>,
    method: Method,
    uri: Uri,
) -> Response {
    let path = uri.path();
    if !is_api_path(path) && (method == Method::GET || method == Method::HEAD) {
        return Html(shell.html().to_string()).into_response();
    }
    AppError::NotFound(format!("No route for {} {}", method, path)).into_response()
}
