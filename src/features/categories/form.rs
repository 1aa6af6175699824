//! Category form state to datastore payloads
//!
//! Create writes every field; update writes the minimal diff against the
//! stored record, with `qTemplate` and `FAQs` always included.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::features::categories::dtos::CategoryFormDto;
use crate::features::categories::models::{fields, Category};
use crate::modules::datastore::{date_value, Db, Fields, Patch, Pointer};
use crate::shared::constants::{CATEGORY_CLASS, FAQ_CLASS};

/// Split a comma-separated id list, dropping blank segments
pub fn parse_faq_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn faq_pointers(db: &Db, raw: &str) -> Vec<Pointer> {
    let faqs = db.class(FAQ_CLASS);
    parse_faq_ids(raw)
        .into_iter()
        .map(|id| faqs.object(id))
        .collect()
}

fn pointer_list(pointers: Vec<Pointer>) -> Value {
    Value::Array(pointers.iter().map(Pointer::to_value).collect())
}

/// Fields for a new category; `parent_id` has already been validated
pub fn create_fields(db: &Db, form: &CategoryFormDto, parent_id: Option<&str>) -> Fields {
    let mut record = Fields::new();
    record.insert(fields::NAME.into(), Value::String(form.name.trim().to_string()));
    record.insert(
        fields::DESCRIPTION.into(),
        Value::String(form.description.clone()),
    );
    if let Some(parent_id) = parent_id {
        record.insert(
            fields::PARENT.into(),
            db.class(CATEGORY_CLASS).object(parent_id).to_value(),
        );
    }
    record.insert(
        fields::Q_TEMPLATE.into(),
        Value::String(form.q_template.clone()),
    );
    record.insert(fields::FAQS.into(), pointer_list(faq_pointers(db, &form.faqs)));
    record
}

/// Minimal update for an existing category; `parent_id` has already been validated
pub fn update_patch(
    db: &Db,
    stored: &Category,
    form: &CategoryFormDto,
    parent_id: Option<&str>,
) -> Patch {
    let mut patch = Patch::new()
        .set(fields::Q_TEMPLATE, form.q_template.clone())
        .set(fields::FAQS, pointer_list(faq_pointers(db, &form.faqs)));

    if stored.parent_id.as_deref() != parent_id {
        patch = match parent_id {
            Some(id) => patch.set(
                fields::PARENT,
                db.class(CATEGORY_CLASS).object(id).to_value(),
            ),
            None => patch.unset(fields::PARENT),
        };
    }

    let name = form.name.trim();
    if stored.name != name {
        patch = patch.set(fields::NAME, name);
    }

    if stored.description.as_deref().unwrap_or_default() != form.description {
        patch = patch.set(fields::DESCRIPTION, form.description.clone());
    }

    patch
}

/// Soft-disable: stamp `deletedAt` and move the record past every active one
pub fn disable_patch(now: DateTime<Utc>, active_orders: impl IntoIterator<Item = i64>) -> Patch {
    let after_active = active_orders
        .into_iter()
        .max()
        .map(|max| max.saturating_add(1))
        .unwrap_or(i64::MIN);
    let order = now.timestamp_millis().max(after_active);

    Patch::new()
        .set(fields::DELETED_AT, date_value(now))
        .set(fields::ORDER, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::datastore::{FieldOp, MemoryStore};
    use serde_json::json;
    use std::sync::Arc;

    fn db() -> Db {
        Db::new(Arc::new(MemoryStore::new()))
    }

    fn stored() -> Category {
        Category {
            id: "c2".to_string(),
            name: "Refunds".to_string(),
            description: Some("Money back".to_string()),
            q_template: Some("Order:".to_string()),
            parent_id: Some("c1".to_string()),
            faq_ids: vec!["f1".to_string()],
            deleted_at: None,
            order: Some(2),
            created_at: None,
            updated_at: None,
        }
    }

    fn form_of(category: &Category) -> CategoryFormDto {
        CategoryFormDto::from(category)
    }

    #[test]
    fn test_parse_faq_ids_drops_blank_segments() {
        assert_eq!(parse_faq_ids("a,,b"), vec!["a", "b"]);
        assert_eq!(parse_faq_ids(" a , b ,"), vec!["a", "b"]);
        assert!(parse_faq_ids("").is_empty());
        assert!(parse_faq_ids(" , ").is_empty());
    }

    #[test]
    fn test_faq_pointers_reference_faq_collection() {
        let pointers = faq_pointers(&db(), "a,,b");
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0], Pointer::new("FAQ", "a"));
        assert_eq!(pointers[1], Pointer::new("FAQ", "b"));
    }

    #[test]
    fn test_create_fields_without_parent() {
        let form = CategoryFormDto {
            name: " Shipping ".to_string(),
            description: "Where is my parcel".to_string(),
            q_template: String::new(),
            faqs: "f1".to_string(),
            parent_id: None,
        };

        let record = create_fields(&db(), &form, None);
        assert_eq!(record["name"], json!("Shipping"));
        assert_eq!(record["description"], json!("Where is my parcel"));
        assert_eq!(record["qTemplate"], json!(""));
        assert!(!record.contains_key("parent"));
        assert_eq!(
            record["FAQs"],
            json!([{ "__type": "Pointer", "className": "FAQ", "objectId": "f1" }])
        );
    }

    #[test]
    fn test_create_fields_with_parent_pointer() {
        let form = CategoryFormDto {
            name: "Child".to_string(),
            ..Default::default()
        };
        let record = create_fields(&db(), &form, Some("c1"));
        assert_eq!(
            record["parent"],
            json!({ "__type": "Pointer", "className": "Category", "objectId": "c1" })
        );
    }

    #[test]
    fn test_unchanged_form_writes_only_always_included_fields() {
        let category = stored();
        let patch = update_patch(&db(), &category, &form_of(&category), Some("c1"));

        let keys: Vec<&str> = patch.keys().collect();
        assert_eq!(keys, vec!["FAQs", "qTemplate"]);
    }

    #[test]
    fn test_description_only_change() {
        let category = stored();
        let mut form = form_of(&category);
        form.description = "Refund policy".to_string();

        let patch = update_patch(&db(), &category, &form, Some("c1"));
        assert_eq!(
            patch.get("description"),
            Some(&FieldOp::Set(json!("Refund policy")))
        );
        assert!(!patch.contains_key("name"));
        assert!(!patch.contains_key("parent"));
        assert_eq!(patch.len(), 3);
    }

    #[test]
    fn test_cleared_parent_is_explicitly_unset() {
        let category = stored();
        let mut form = form_of(&category);
        form.parent_id = None;

        let patch = update_patch(&db(), &category, &form, None);
        assert_eq!(patch.get("parent"), Some(&FieldOp::Unset));
        assert_eq!(
            serde_json::to_value(&patch).unwrap()["parent"],
            json!({ "__op": "Delete" })
        );
    }

    #[test]
    fn test_changed_parent_is_set_as_pointer() {
        let category = stored();
        let patch = update_patch(&db(), &category, &form_of(&category), Some("c9"));
        assert_eq!(
            patch.get("parent"),
            Some(&FieldOp::Set(Pointer::new("Category", "c9").to_value()))
        );
    }

    #[test]
    fn test_rename_is_trimmed_and_compared() {
        let category = stored();
        let mut form = form_of(&category);
        form.name = "  Refunds  ".to_string();
        let patch = update_patch(&db(), &category, &form, Some("c1"));
        assert!(!patch.contains_key("name"));

        form.name = "Returns".to_string();
        let patch = update_patch(&db(), &category, &form, Some("c1"));
        assert_eq!(patch.get("name"), Some(&FieldOp::Set(json!("Returns"))));
    }

    #[test]
    fn test_disable_order_sorts_after_every_active_category() {
        let now = Utc::now();
        let far_future = now.timestamp_millis() + 1_000_000;

        let patch = disable_patch(now, vec![1, 2, far_future]);
        assert_eq!(
            patch.get("order"),
            Some(&FieldOp::Set(json!(far_future + 1)))
        );
        assert_eq!(patch.get("deletedAt"), Some(&FieldOp::Set(date_value(now))));

        let patch = disable_patch(now, vec![1, 2]);
        assert_eq!(
            patch.get("order"),
            Some(&FieldOp::Set(json!(now.timestamp_millis())))
        );

        let patch = disable_patch(now, Vec::new());
        assert_eq!(
            patch.get("order"),
            Some(&FieldOp::Set(json!(now.timestamp_millis())))
        );
    }
}
