use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::core::config::WebhookConfig;
use crate::core::error::{AppError, Result};
use crate::features::webhooks::models::{fields, Webhook};
use crate::modules::datastore::{Db, Query};
use crate::shared::constants::WEBHOOK_CLASS;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Result of one delivery attempt
#[derive(Debug, Clone)]
pub struct Delivery {
    pub webhook_id: String,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// In-memory set of active webhooks, reloaded from the `Webhook` collection
pub struct WebhookRegistry {
    db: Db,
    client: reqwest::Client,
    hooks: RwLock<Arc<Vec<Webhook>>>,
}

impl WebhookRegistry {
    pub fn new(db: Db, config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.delivery_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self {
            db,
            client,
            hooks: RwLock::new(Arc::new(Vec::new())),
        })
    }

    /// Reload active webhooks and swap them in; returns how many are registered
    pub async fn refresh(&self) -> Result<usize> {
        let documents = self
            .db
            .class(WEBHOOK_CLASS)
            .find(&Query::new().exists(fields::DELETED_AT, false))
            .await?;

        let mut hooks = Vec::with_capacity(documents.len());
        for doc in &documents {
            match Webhook::from_document(doc) {
                Some(hook) => hooks.push(hook),
                None => tracing::warn!(
                    "Skipping webhook '{}': url is not an absolute http(s) URL",
                    doc.id
                ),
            }
        }

        let count = hooks.len();
        *self.hooks.write().await = Arc::new(hooks);
        Ok(count)
    }

    pub async fn webhooks(&self) -> Arc<Vec<Webhook>> {
        self.hooks.read().await.clone()
    }

    /// Fire-and-forget delivery of `event` to every subscribed webhook
    pub fn dispatch(self: &Arc<Self>, event: &str, payload: Value) {
        let registry = Arc::clone(self);
        let event = event.to_string();
        tokio::spawn(async move {
            for delivery in registry.deliver_all(&event, &payload).await {
                if let Some(error) = delivery.error {
                    tracing::warn!(
                        "Webhook '{}' delivery of {} failed: {}",
                        delivery.webhook_id,
                        event,
                        error
                    );
                }
            }
        });
    }

    /// Deliver `event` to every subscribed webhook and wait for all of them
    pub async fn deliver_all(&self, event: &str, payload: &Value) -> Vec<Delivery> {
        let hooks = self.webhooks().await;
        let body = json!({
            "event": event,
            "payload": payload,
            "ts": Utc::now().timestamp_millis(),
        });

        let body = match serde_json::to_vec(&body) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to encode webhook payload for {}: {}", event, e);
                return Vec::new();
            }
        };

        let deliveries = hooks
            .iter()
            .filter(|hook| hook.accepts(event))
            .map(|hook| self.deliver(hook, &body));

        join_all(deliveries).await
    }

    async fn deliver(&self, hook: &Webhook, body: &[u8]) -> Delivery {
        let mut request = self
            .client
            .post(hook.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());

        if let Some(secret) = &hook.secret {
            match sign(secret, body) {
                Ok(signature) => {
                    request = request.header(SIGNATURE_HEADER, format!("sha256={}", signature));
                }
                Err(e) => {
                    return Delivery {
                        webhook_id: hook.id.clone(),
                        status: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => Delivery {
                webhook_id: hook.id.clone(),
                status: Some(response.status().as_u16()),
                error: None,
            },
            Ok(response) => Delivery {
                webhook_id: hook.id.clone(),
                status: Some(response.status().as_u16()),
                error: Some(format!("endpoint answered {}", response.status())),
            },
            Err(e) => Delivery {
                webhook_id: hook.id.clone(),
                status: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Hex HMAC-SHA256 of the request body
pub fn sign(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::datastore::{date_value, MemoryStore};
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> WebhookConfig {
        WebhookConfig {
            delivery_timeout: Duration::from_secs(5),
            user_agent: "helpdesk-test".to_string(),
        }
    }

    async fn seeded(urls: &[(&str, Option<&str>, bool)]) -> (Db, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for (i, (url, secret, disabled)) in urls.iter().enumerate() {
            let mut fields = serde_json::Map::new();
            fields.insert("url".into(), json!(url));
            if let Some(secret) = secret {
                fields.insert("secret".into(), json!(secret));
            }
            if *disabled {
                fields.insert("deletedAt".into(), date_value(Utc::now()));
            }
            store.insert_with_id(WEBHOOK_CLASS, &format!("w{}", i), fields).await;
        }
        (Db::new(store.clone()), store)
    }

    #[test]
    fn test_sign_matches_known_vector() {
        // RFC 4231 test case 2
        let signature = sign("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[tokio::test]
    async fn test_refresh_skips_disabled_and_invalid_urls() {
        let (db, _) = seeded(&[
            ("https://hooks.example.com/a", None, false),
            ("https://hooks.example.com/b", None, true),
            ("mailto:someone@example.com", None, false),
        ])
        .await;

        let registry = WebhookRegistry::new(db, &config()).unwrap();
        assert_eq!(registry.refresh().await.unwrap(), 1);

        let hooks = registry.webhooks().await;
        assert_eq!(hooks[0].id, "w0");
    }

    #[tokio::test]
    async fn test_deliver_all_signs_body_when_secret_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signed"))
            .and(header_exists(SIGNATURE_HEADER))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/plain"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let signed = format!("{}/signed", server.uri());
        let plain = format!("{}/plain", server.uri());
        let (db, _) = seeded(&[(&signed, Some("s3cret"), false), (&plain, None, false)]).await;

        let registry = WebhookRegistry::new(db, &config()).unwrap();
        registry.refresh().await.unwrap();

        let deliveries = registry
            .deliver_all("category.created", &json!({ "id": "c1" }))
            .await;
        assert_eq!(deliveries.len(), 2);

        let by_id = |id: &str| deliveries.iter().find(|d| d.webhook_id == id).unwrap();
        assert!(by_id("w0").is_success());
        assert!(!by_id("w1").is_success());
        assert_eq!(by_id("w1").status, Some(500));

        let requests = server.received_requests().await.unwrap();
        let signed_request = requests.iter().find(|r| r.url.path() == "/signed").unwrap();
        let body: Value = serde_json::from_slice(&signed_request.body).unwrap();
        assert_eq!(body["event"], "category.created");
        assert_eq!(body["payload"]["id"], "c1");

        let expected = format!("sha256={}", sign("s3cret", &signed_request.body).unwrap());
        assert_eq!(
            signed_request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap(),
            expected
        );
    }
}
