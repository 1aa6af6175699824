use reqwest::Url;

use crate::modules::datastore::Document;

pub mod fields {
    pub const URL: &str = "url";
    pub const SECRET: &str = "secret";
    pub const EVENTS: &str = "events";
    pub const DELETED_AT: &str = "deletedAt";
}

/// Registered delivery target
#[derive(Debug, Clone, PartialEq)]
pub struct Webhook {
    pub id: String,
    pub url: Url,
    pub secret: Option<String>,
    /// Event names this hook receives; empty means every event
    pub events: Vec<String>,
}

impl Webhook {
    /// Parse a stored record; `None` when the URL is not an absolute http(s) URL
    pub fn from_document(doc: &Document) -> Option<Self> {
        let url = Url::parse(doc.get_str(fields::URL)?.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let events = doc
            .get(fields::EVENTS)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|e| e.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: doc.id.clone(),
            url,
            secret: doc
                .get_str(fields::SECRET)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            events,
        })
    }

    /// Whether this hook subscribes to `event`
    ///
    /// Filters match exactly, `*` matches everything and `category.*`
    /// matches every event under that prefix.
    pub fn accepts(&self, event: &str) -> bool {
        if self.events.is_empty() {
            return true;
        }
        self.events.iter().any(|filter| match filter.strip_suffix('*') {
            Some(prefix) => event.starts_with(prefix),
            None => filter == event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: serde_json::Value) -> Document {
        Document {
            id: "w1".to_string(),
            class_name: "Webhook".to_string(),
            fields: fields.as_object().cloned().unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_from_document_requires_http_url() {
        assert!(Webhook::from_document(&doc(json!({ "url": "https://hooks.example.com/a" }))).is_some());
        assert!(Webhook::from_document(&doc(json!({ "url": "ftp://example.com" }))).is_none());
        assert!(Webhook::from_document(&doc(json!({ "url": "not a url" }))).is_none());
        assert!(Webhook::from_document(&doc(json!({}))).is_none());
    }

    #[test]
    fn test_event_filters() {
        let all = Webhook::from_document(&doc(json!({ "url": "http://a.test" }))).unwrap();
        assert!(all.accepts("category.created"));

        let filtered = Webhook::from_document(&doc(json!({
            "url": "http://a.test",
            "events": ["category.disabled", "ticket.*"],
            "secret": ""
        })))
        .unwrap();
        assert_eq!(filtered.secret, None);
        assert!(filtered.accepts("category.disabled"));
        assert!(filtered.accepts("ticket.created"));
        assert!(!filtered.accepts("category.created"));
    }
}
