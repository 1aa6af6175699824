use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("{class} '{id}' not found")]
    NotFound { class: String, id: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Datastore responded with HTTP {status} (code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl DatastoreError {
    pub fn not_found(class: &str, id: &str) -> Self {
        Self::NotFound {
            class: class.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DatastoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            DatastoreError::Http(_) | DatastoreError::Api { .. } => StatusCode::BAD_GATEWAY,
            DatastoreError::Database(_) | DatastoreError::InvalidDocument(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
