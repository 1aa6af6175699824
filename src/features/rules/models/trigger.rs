use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::modules::datastore::Document;

pub mod fields {
    pub const TITLE: &str = "title";
    pub const CONDITIONS: &str = "conditions";
    pub const ACTIONS: &str = "actions";
    pub const ACTIVE: &str = "active";
}

/// Ticket status codes a trigger may test or set
pub const TICKET_STATUSES: [i64; 6] = [50, 120, 160, 220, 250, 280];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringOp {
    Is,
    IsNot,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EqualityOp {
    Is,
    IsNot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Condition {
    Title { op: StringOp, value: String },
    Content { op: StringOp, value: String },
    CategoryId { op: EqualityOp, value: String },
    AuthorId { op: EqualityOp, value: String },
    AssigneeId { op: EqualityOp, value: String },
    Status { op: EqualityOp, value: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default)]
    pub any: Vec<Condition>,
    #[serde(default)]
    pub all: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    UpdateAssigneeId { value: String },
    UpdateCategoryId { value: String },
    UpdateStatus { value: i64 },
    CloseTicket,
}

#[derive(Debug, Error, PartialEq)]
pub enum TriggerError {
    #[error("conditions are malformed: {0}")]
    Conditions(String),

    #[error("actions are malformed: {0}")]
    Actions(String),

    #[error("trigger has no actions")]
    NoActions,

    #[error("{0} must not be empty")]
    EmptyValue(&'static str),

    #[error("unknown ticket status {0}")]
    UnknownStatus(i64),

    #[error("category '{0}' does not exist")]
    UnknownCategory(String),

    #[error("category '{0}' is disabled")]
    DisabledCategory(String),
}

/// Automation rule applied to tickets
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub id: String,
    pub title: String,
    pub conditions: Conditions,
    pub actions: Vec<Action>,
    pub active: bool,
}

impl Trigger {
    /// Parse the stored conditions and actions into typed values
    pub fn from_document(doc: &Document) -> Result<Self, TriggerError> {
        let conditions = match doc.get(fields::CONDITIONS) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| TriggerError::Conditions(e.to_string()))?,
            None => return Err(TriggerError::Conditions("missing".to_string())),
        };

        let actions: Vec<Action> = match doc.get(fields::ACTIONS) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| TriggerError::Actions(e.to_string()))?,
            None => Vec::new(),
        };

        Ok(Self {
            id: doc.id.clone(),
            title: doc.get_str(fields::TITLE).unwrap_or_default().to_string(),
            conditions,
            actions,
            active: doc.get_bool(fields::ACTIVE).unwrap_or(false),
        })
    }

    /// Check everything that does not need the datastore
    pub fn check(&self) -> Result<(), TriggerError> {
        if self.actions.is_empty() {
            return Err(TriggerError::NoActions);
        }

        for condition in self.conditions.any.iter().chain(&self.conditions.all) {
            match condition {
                Condition::CategoryId { value, .. } if value.is_empty() => {
                    return Err(TriggerError::EmptyValue("categoryId"))
                }
                Condition::AuthorId { value, .. } if value.is_empty() => {
                    return Err(TriggerError::EmptyValue("authorId"))
                }
                Condition::AssigneeId { value, .. } if value.is_empty() => {
                    return Err(TriggerError::EmptyValue("assigneeId"))
                }
                Condition::Status { value, .. } => check_status(*value)?,
                _ => {}
            }
        }

        for action in &self.actions {
            match action {
                Action::UpdateAssigneeId { value } if value.is_empty() => {
                    return Err(TriggerError::EmptyValue("assigneeId"))
                }
                Action::UpdateCategoryId { value } if value.is_empty() => {
                    return Err(TriggerError::EmptyValue("categoryId"))
                }
                Action::UpdateStatus { value } => check_status(*value)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// Category ids referenced by conditions and actions
    pub fn category_ids(&self) -> Vec<&str> {
        let from_conditions = self
            .conditions
            .any
            .iter()
            .chain(&self.conditions.all)
            .filter_map(|c| match c {
                Condition::CategoryId { value, .. } => Some(value.as_str()),
                _ => None,
            });
        let from_actions = self.actions.iter().filter_map(|a| match a {
            Action::UpdateCategoryId { value } => Some(value.as_str()),
            _ => None,
        });
        from_conditions.chain(from_actions).collect()
    }
}

fn check_status(status: i64) -> Result<(), TriggerError> {
    if TICKET_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(TriggerError::UnknownStatus(status))
    }
}

/// Title of a stored trigger, readable even when the rest fails to parse
pub fn raw_title(doc: &Document) -> String {
    doc.get(fields::TITLE)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
