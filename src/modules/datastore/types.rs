//! Value types shared by every datastore backend.
//!
//! Documents are schemaless JSON objects. Relations, dates and the explicit
//! "unset" marker use the LeanCloud REST encoding so the same payload works
//! against the hosted service and the local backends.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

pub type Fields = Map<String, Value>;

/// Reference to a document in another collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "Pointer", rename_all = "camelCase")]
pub struct Pointer {
    pub class_name: String,
    pub object_id: String,
}

impl Pointer {
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "__type": "Pointer",
            "className": self.class_name,
            "objectId": self.object_id,
        })
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Encode a timestamp as a typed date value
pub fn date_value(at: DateTime<Utc>) -> Value {
    json!({
        "__type": "Date",
        "iso": at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Decode either a typed date value or a bare RFC 3339 string
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let iso = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) if obj.get("__type").and_then(Value::as_str) == Some("Date") => {
            obj.get("iso")?.as_str()?
        }
        _ => return None,
    };
    DateTime::parse_from_rfc3339(iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A single field operation inside an update payload
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    /// Remove the field from the stored document
    Unset,
}

impl Serialize for FieldOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldOp::Set(value) => value.serialize(serializer),
            FieldOp::Unset => json!({ "__op": "Delete" }).serialize(serializer),
        }
    }
}

/// Partial update payload; only the listed fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Patch(BTreeMap<String, FieldOp>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), FieldOp::Set(value.into()));
        self
    }

    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldOp::Unset);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, op: FieldOp) {
        self.0.insert(key.into(), op);
    }

    pub fn get(&self, key: &str) -> Option<&FieldOp> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOp)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Apply the patch to an in-memory field map
    pub fn apply_to(&self, fields: &mut Fields) {
        for (key, op) in &self.0 {
            match op {
                FieldOp::Set(value) => {
                    fields.insert(key.clone(), value.clone());
                }
                FieldOp::Unset => {
                    fields.remove(key);
                }
            }
        }
    }

    /// Split into the fields to merge and the keys to remove
    pub fn split(&self) -> (Fields, Vec<String>) {
        let mut set = Fields::new();
        let mut unset = Vec::new();
        for (key, op) in &self.0 {
            match op {
                FieldOp::Set(value) => {
                    set.insert(key.clone(), value.clone());
                }
                FieldOp::Unset => unset.push(key.clone()),
            }
        }
        (set, unset)
    }
}

/// Stored document with its store-managed metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub class_name: String,
    pub fields: Fields,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().map(|f| f as i64))
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_date(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(parse_date)
    }

    pub fn get_pointer(&self, key: &str) -> Option<Pointer> {
        self.get(key).and_then(Pointer::from_value)
    }

    /// Pointers in a list field; entries that are not pointers are skipped
    pub fn get_pointers(&self, key: &str) -> Vec<Pointer> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Pointer::from_value).collect())
            .unwrap_or_default()
    }

    /// The pointer that refers to this document
    pub fn pointer(&self) -> Pointer {
        Pointer::new(&self.class_name, &self.id)
    }
}

/// Filter on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    EqualTo(Value),
    /// `true` matches present non-null values, `false` absent or null ones
    Exists(bool),
}

/// Collection query; results come back in store order, callers sort
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub constraints: BTreeMap<String, Constraint>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal_to(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints
            .insert(key.into(), Constraint::EqualTo(value.into()));
        self
    }

    pub fn exists(mut self, key: impl Into<String>, exists: bool) -> Self {
        self.constraints.insert(key.into(), Constraint::Exists(exists));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the constraints against a field map
    pub fn matches(&self, fields: &Fields) -> bool {
        self.constraints.iter().all(|(key, constraint)| {
            let value = fields.get(key).filter(|v| !v.is_null());
            match constraint {
                Constraint::EqualTo(expected) => value == Some(expected),
                Constraint::Exists(exists) => value.is_some() == *exists,
            }
        })
    }

    /// LeanCloud `where` clause
    pub fn where_clause(&self) -> Value {
        let mut clause = Fields::new();
        for (key, constraint) in &self.constraints {
            let value = match constraint {
                Constraint::EqualTo(v) => v.clone(),
                Constraint::Exists(exists) => json!({ "$exists": exists }),
            };
            clause.insert(key.clone(), value);
        }
        Value::Object(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pointer_encoding() {
        let pointer = Pointer::new("FAQ", "abc");
        let value = serde_json::to_value(&pointer).unwrap();
        assert_eq!(
            value,
            json!({ "__type": "Pointer", "className": "FAQ", "objectId": "abc" })
        );
        assert_eq!(pointer.to_value(), value);
        assert_eq!(Pointer::from_value(&value), Some(pointer));
        assert_eq!(Pointer::from_value(&json!("abc")), None);
    }

    #[test]
    fn test_unset_serializes_as_delete_op() {
        let patch = Patch::new().set("name", "Billing").unset("parent");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "name": "Billing", "parent": { "__op": "Delete" } })
        );
    }

    #[test]
    fn test_patch_apply_and_split() {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("Old"));
        fields.insert("parent".into(), Pointer::new("Category", "p").to_value());

        let patch = Patch::new().set("name", "New").unset("parent");
        patch.apply_to(&mut fields);

        assert_eq!(fields.get("name"), Some(&json!("New")));
        assert!(!fields.contains_key("parent"));

        let (set, unset) = patch.split();
        assert_eq!(set.get("name"), Some(&json!("New")));
        assert_eq!(unset, vec!["parent".to_string()]);
    }

    #[test]
    fn test_date_roundtrip_accepts_both_forms() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_date(&date_value(at)), Some(at));
        assert_eq!(parse_date(&json!("2024-05-01T08:30:00Z")), Some(at));
        assert_eq!(parse_date(&json!(42)), None);
    }

    #[test]
    fn test_query_matches_treats_null_as_absent() {
        let query = Query::new().exists("deletedAt", false).equal_to("kind", "a");

        let mut fields = Fields::new();
        fields.insert("kind".into(), json!("a"));
        fields.insert("deletedAt".into(), Value::Null);
        assert!(query.matches(&fields));

        fields.insert("deletedAt".into(), date_value(Utc::now()));
        assert!(!query.matches(&fields));
    }

    #[test]
    fn test_where_clause() {
        let query = Query::new().exists("deletedAt", false).equal_to("active", true);
        assert_eq!(
            query.where_clause(),
            json!({ "active": true, "deletedAt": { "$exists": false } })
        );
    }
}
