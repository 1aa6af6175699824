//! LeanCloud-compatible REST client
//!
//! Talks to the hosted document service through `/1.1/classes/{Class}`.
//! Authentication uses the `X-LC-Id` / `X-LC-Key` headers; with a master key
//! configured the key header is sent as `<master>,master`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    parse_date, Datastore, DatastoreError, DatastoreResult, Document, Fields, Patch, Query,
};
use crate::core::config::LeanCloudConfig;

/// Upper bound the service accepts for a single query page
const MAX_QUERY_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<i64>,
    error: Option<String>,
}

pub struct LeanCloudClient {
    client: Client,
    server_url: String,
}

impl LeanCloudClient {
    pub fn new(config: &LeanCloudConfig) -> DatastoreResult<Self> {
        let key = match &config.master_key {
            Some(master) => format!("{},master", master),
            None => config.app_key.clone(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "X-LC-Id",
            HeaderValue::from_str(&config.app_id)
                .map_err(|e| DatastoreError::InvalidDocument(format!("Invalid app id: {}", e)))?,
        );
        headers.insert(
            "X-LC-Key",
            HeaderValue::from_str(&key)
                .map_err(|e| DatastoreError::InvalidDocument(format!("Invalid app key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            server_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    fn class_url(&self, class_name: &str) -> String {
        format!("{}/1.1/classes/{}", self.server_url, class_name)
    }

    fn object_url(&self, class_name: &str, id: &str) -> String {
        format!("{}/{}", self.class_url(class_name), id)
    }

    /// Turn a non-success response into an error, keeping the service's code
    async fn error_from(response: Response, class_name: &str, id: Option<&str>) -> DatastoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();

        // Code 101 is "object not found" on the hosted service
        let code = parsed.as_ref().and_then(|b| b.code);
        if let Some(id) = id {
            if status == StatusCode::NOT_FOUND || code == Some(101) {
                return DatastoreError::not_found(class_name, id);
            }
        }

        DatastoreError::Api {
            status: status.as_u16(),
            code,
            message: parsed
                .and_then(|b| b.error)
                .unwrap_or_else(|| body.chars().take(200).collect()),
        }
    }
}

/// Split a REST object into metadata and user fields
fn into_document(class_name: &str, value: Value) -> DatastoreResult<Document> {
    let Value::Object(mut fields) = value else {
        return Err(DatastoreError::InvalidDocument(format!(
            "{} object is not a JSON object",
            class_name
        )));
    };

    let id = match fields.remove("objectId") {
        Some(Value::String(id)) => id,
        _ => {
            return Err(DatastoreError::InvalidDocument(format!(
                "{} object has no objectId",
                class_name
            )))
        }
    };
    let created_at = fields.remove("createdAt").as_ref().and_then(parse_date);
    let updated_at = fields.remove("updatedAt").as_ref().and_then(parse_date);
    fields.remove("ACL");

    Ok(Document {
        id,
        class_name: class_name.to_string(),
        fields,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl Datastore for LeanCloudClient {
    fn backend_name(&self) -> &'static str {
        "leancloud"
    }

    /// Pages through results with `skip` until the query limit or the data runs out
    async fn find(&self, class_name: &str, query: &Query) -> DatastoreResult<Vec<Document>> {
        let where_clause = query.where_clause().to_string();
        let wanted = query.limit;

        debug!("Querying {} where {}", class_name, where_clause);

        let mut documents = Vec::new();
        loop {
            let page_size = match wanted {
                Some(wanted) => (wanted - documents.len()).min(MAX_QUERY_LIMIT),
                None => MAX_QUERY_LIMIT,
            };
            if page_size == 0 {
                break;
            }

            let response = self
                .client
                .get(self.class_url(class_name))
                .query(&[
                    ("where", where_clause.clone()),
                    ("order", "createdAt".to_string()),
                    ("limit", page_size.to_string()),
                    ("skip", documents.len().to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::error_from(response, class_name, None).await);
            }

            let body: QueryResponse = response.json().await?;
            let received = body.results.len();
            for value in body.results {
                documents.push(into_document(class_name, value)?);
            }

            if received < page_size {
                break;
            }
            debug!(
                "Fetched {} {} records so far, requesting next page",
                documents.len(),
                class_name
            );
        }

        Ok(documents)
    }

    async fn get(&self, class_name: &str, id: &str) -> DatastoreResult<Document> {
        let response = self.client.get(self.object_url(class_name, id)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, class_name, Some(id)).await);
        }

        let value: Value = response.json().await?;
        // The service answers an unknown id with an empty object
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Err(DatastoreError::not_found(class_name, id));
        }
        into_document(class_name, value)
    }

    async fn add(&self, class_name: &str, fields: Fields) -> DatastoreResult<Document> {
        let response = self
            .client
            .post(self.class_url(class_name))
            .json(&fields)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, class_name, None).await);
        }

        // Creation only echoes objectId and createdAt
        let Value::Object(mut created) = response.json::<Value>().await? else {
            return Err(DatastoreError::InvalidDocument(
                "create response is not a JSON object".to_string(),
            ));
        };
        for (key, value) in fields {
            created.entry(key).or_insert(value);
        }

        let mut document = into_document(class_name, Value::Object(created))?;
        document.updated_at = document.updated_at.or(document.created_at);
        Ok(document)
    }

    async fn update(&self, class_name: &str, id: &str, patch: &Patch) -> DatastoreResult<()> {
        let response = self
            .client
            .put(self.object_url(class_name, id))
            .json(patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, class_name, Some(id)).await);
        }

        Ok(())
    }
}
