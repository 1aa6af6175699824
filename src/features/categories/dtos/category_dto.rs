use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::features::categories::models::Category;
use crate::features::categories::tree::{CategoryNode, CategoryTree};
use crate::shared::validation::OBJECT_ID_REGEX;

/// Response DTO for category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponseDto {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub q_template: Option<String>,
    #[serde(rename = "FAQs")]
    pub faq_ids: Vec<String>,
    pub order: Option<i64>,
    pub disabled: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            disabled: !c.is_active(),
            id: c.id,
            parent_id: c.parent_id,
            name: c.name,
            description: c.description,
            q_template: c.q_template,
            faq_ids: c.faq_ids,
            order: c.order,
            deleted_at: c.deleted_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response DTO for category tree (hierarchical structure)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub disabled: bool,
    pub children: Vec<CategoryTreeDto>,
}

impl CategoryTreeDto {
    /// Nested view of the whole forest, roots first
    pub fn from_tree(tree: &CategoryTree) -> Vec<CategoryTreeDto> {
        tree.roots()
            .map(|root| Self::build_node(tree, root))
            .collect()
    }

    fn build_node(tree: &CategoryTree, node: &CategoryNode) -> CategoryTreeDto {
        let category = &node.category;
        CategoryTreeDto {
            id: category.id.clone(),
            name: category.name.clone(),
            description: category.description.clone(),
            order: category.order,
            disabled: !category.is_active(),
            children: tree
                .children(node)
                .map(|child| Self::build_node(tree, child))
                .collect(),
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Name is required".into()));
    }
    Ok(())
}

fn validate_faq_ids(value: &str) -> Result<(), ValidationError> {
    let invalid = value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .any(|id| !OBJECT_ID_REGEX.is_match(id));

    if invalid {
        return Err(ValidationError::new("faq_ids")
            .with_message("FAQs must be a comma-separated list of object ids".into()));
    }
    Ok(())
}

/// Editable state of the category form
///
/// `FAQs` is the raw comma-separated id list as typed by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFormDto {
    #[validate(
        length(max = 128, message = "Name must not exceed 128 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub q_template: String,

    #[serde(default, rename = "FAQs")]
    #[validate(custom(function = "validate_faq_ids"))]
    pub faqs: String,

    #[serde(default)]
    pub parent_id: Option<String>,
}

impl From<&Category> for CategoryFormDto {
    fn from(c: &Category) -> Self {
        Self {
            name: c.name.clone(),
            description: c.description.clone().unwrap_or_default(),
            q_template: c.q_template.clone().unwrap_or_default(),
            faqs: c.faq_ids.join(","),
            parent_id: c.parent_id.clone(),
        }
    }
}

/// Request DTO for checking a parent selection before saving
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentCheckRequestDto {
    /// Category being edited; omit for a new category
    pub category_id: Option<String>,
    /// Proposed parent; omit or empty to detach
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentCheckResponseDto {
    pub accepted: bool,
    pub parent_id: Option<String>,
}

/// Request DTO for disabling a category
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DisableCategoryRequestDto {
    /// Must be true; the admin confirmed the action
    #[serde(default)]
    pub confirm: bool,
}

/// Result of a create / update / disable
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMutationDto {
    pub category: CategoryResponseDto,
    /// Client route to navigate to after the mutation
    pub redirect_to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, faqs: &str) -> CategoryFormDto {
        CategoryFormDto {
            name: name.to_string(),
            faqs: faqs.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_form_validation() {
        assert!(form("Billing", "").validate().is_ok());
        assert!(form("Billing", "a,,b").validate().is_ok());
        assert!(form("   ", "").validate().is_err());
        assert!(form("Billing", "a,b c").validate().is_err());
        assert!(form(&"x".repeat(129), "").validate().is_err());
    }

    #[test]
    fn test_form_deserializes_client_field_names() {
        let dto: CategoryFormDto = serde_json::from_value(serde_json::json!({
            "name": "Billing",
            "qTemplate": "Invoice id:",
            "FAQs": "f1,f2",
            "parentId": "p1"
        }))
        .unwrap();

        assert_eq!(dto.q_template, "Invoice id:");
        assert_eq!(dto.faqs, "f1,f2");
        assert_eq!(dto.parent_id.as_deref(), Some("p1"));
        assert_eq!(dto.description, "");
    }
}
