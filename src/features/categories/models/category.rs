use chrono::{DateTime, Utc};

use crate::modules::datastore::Document;

/// Field names as stored in the `Category` collection
pub mod fields {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const Q_TEMPLATE: &str = "qTemplate";
    pub const PARENT: &str = "parent";
    pub const FAQS: &str = "FAQs";
    pub const DELETED_AT: &str = "deletedAt";
    pub const ORDER: &str = "order";
}

/// Category record loaded from the datastore
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub q_template: Option<String>,
    pub parent_id: Option<String>,
    pub faq_ids: Vec<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub order: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl From<Document> for Category {
    fn from(doc: Document) -> Self {
        Self {
            name: doc.get_str(fields::NAME).unwrap_or_default().to_string(),
            description: doc.get_str(fields::DESCRIPTION).map(str::to_string),
            q_template: doc.get_str(fields::Q_TEMPLATE).map(str::to_string),
            parent_id: doc.get_pointer(fields::PARENT).map(|p| p.object_id),
            faq_ids: doc
                .get_pointers(fields::FAQS)
                .into_iter()
                .map(|p| p.object_id)
                .collect(),
            deleted_at: doc.get_date(fields::DELETED_AT),
            order: doc.get_i64(fields::ORDER),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            id: doc.id,
        }
    }
}
