use axum::{
    body::Body,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, Request,
    },
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::core::error::AppError;

/// Custom JSON extractor that provides consistent error responses
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppJsonRejection;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(AppJsonRejection(rejection)),
        }
    }
}

pub struct AppJsonRejection(JsonRejection);

impl IntoResponse for AppJsonRejection {
    fn into_response(self) -> Response {
        let message = match self.0 {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err),
            JsonRejection::MissingJsonContentType(err) => {
                format!("Missing JSON content type: {}", err)
            }
            _ => "Failed to parse JSON body".to_string(),
        };

        AppError::BadRequest(message).into_response()
    }
}

/// Body extractor accepting either a JSON or a URL-encoded form body
///
/// The content type picks the parser; anything that is not
/// `application/x-www-form-urlencoded` is parsed as JSON.
pub struct AppBody<T>(pub T);

impl<T, S> FromRequest<S> for AppBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            match Form::<T>::from_request(req, state).await {
                Ok(Form(value)) => Ok(Self(value)),
                Err(rejection) => Err(form_rejection(rejection)),
            }
        } else {
            match AppJson::<T>::from_request(req, state).await {
                Ok(AppJson(value)) => Ok(Self(value)),
                Err(rejection) => Err(rejection.into_response()),
            }
        }
    }
}

fn form_rejection(rejection: FormRejection) -> Response {
    let message = match rejection {
        FormRejection::FailedToDeserializeForm(err) => format!("Invalid form data: {}", err),
        FormRejection::FailedToDeserializeFormBody(err) => format!("Invalid form data: {}", err),
        _ => "Failed to parse form body".to_string(),
    };

    AppError::BadRequest(message).into_response()
}
