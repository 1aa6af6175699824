use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{CategoryFormDto, CategoryResponseDto, CategoryTreeDto};
use crate::features::categories::form;
use crate::features::categories::models::Category;
use crate::features::categories::tree::{CategoryTree, ParentCheck};
use crate::features::webhooks::WebhookRegistry;
use crate::modules::datastore::{Db, Query};
use crate::shared::constants::CATEGORY_CLASS;

/// Service for category operations
pub struct CategoryService {
    db: Db,
    webhooks: Arc<WebhookRegistry>,
}

impl CategoryService {
    pub fn new(db: Db, webhooks: Arc<WebhookRegistry>) -> Self {
        Self { db, webhooks }
    }

    /// Load every category, disabled ones included, into a fresh tree
    pub async fn load_tree(&self) -> Result<CategoryTree> {
        let documents = self
            .db
            .class(CATEGORY_CLASS)
            .find(&Query::new())
            .await
            .map_err(|e| {
                tracing::error!("Failed to load categories: {:?}", e);
                AppError::from(e)
            })?;

        Ok(CategoryTree::build(
            documents.into_iter().map(Category::from).collect(),
        ))
    }

    async fn load_visible_tree(&self, include_disabled: bool) -> Result<CategoryTree> {
        let tree = self.load_tree().await?;
        if include_disabled {
            return Ok(tree);
        }
        Ok(CategoryTree::build(
            tree.iter().filter(|c| c.is_active()).cloned().collect(),
        ))
    }

    /// Categories in tree order (depth-first, siblings by order then name)
    pub async fn list(&self, include_disabled: bool) -> Result<Vec<CategoryResponseDto>> {
        let tree = self.load_visible_tree(include_disabled).await?;
        Ok(tree.iter().cloned().map(CategoryResponseDto::from).collect())
    }

    pub async fn list_tree(&self, include_disabled: bool) -> Result<Vec<CategoryTreeDto>> {
        let tree = self.load_visible_tree(include_disabled).await?;
        Ok(CategoryTreeDto::from_tree(&tree))
    }

    pub async fn get(&self, id: &str) -> Result<CategoryResponseDto> {
        let category = self.fetch(id).await?;
        Ok(category.into())
    }

    /// Stored record as editable form state
    pub async fn form(&self, id: &str) -> Result<CategoryFormDto> {
        let category = self.fetch(id).await?;
        Ok(CategoryFormDto::from(&category))
    }

    /// Validate a parent selection without writing anything
    ///
    /// Returns the accepted parent id, or `None` when the category is detached.
    pub async fn check_parent(
        &self,
        category_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let tree = self.load_tree().await?;
        if let Some(id) = category_id {
            if tree.get(id).is_none() {
                return Err(AppError::NotFound(format!("Category '{}' not found", id)));
            }
        }
        resolve_parent(&tree, category_id, parent_id)
    }

    pub async fn create(&self, dto: &CategoryFormDto) -> Result<CategoryResponseDto> {
        let tree = self.load_tree().await?;
        let parent_id = resolve_parent(&tree, None, dto.parent_id.as_deref())?;

        let record = form::create_fields(&self.db, dto, parent_id.as_deref());
        let document = self
            .db
            .class(CATEGORY_CLASS)
            .add(record)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create category: {:?}", e);
                AppError::from(e)
            })?;

        let category = CategoryResponseDto::from(Category::from(document));
        tracing::info!("Category '{}' created", category.id);
        self.webhooks
            .dispatch("category.created", json!({ "category": &category }));

        Ok(category)
    }

    pub async fn update(&self, id: &str, dto: &CategoryFormDto) -> Result<CategoryResponseDto> {
        let tree = self.load_tree().await?;
        let stored = tree
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", id)))?;

        // Only a newly selected parent is checked; an unchanged one is kept as stored
        let requested = dto
            .parent_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let parent_id = if requested == stored.parent_id.as_deref() {
            stored.parent_id.clone()
        } else {
            resolve_parent(&tree, Some(id), requested)?
        };

        let patch = form::update_patch(&self.db, stored, dto, parent_id.as_deref());
        let changed: Vec<String> = patch.keys().map(str::to_string).collect();

        let categories = self.db.class(CATEGORY_CLASS);
        categories.update(id, &patch).await.map_err(|e| {
            tracing::error!("Failed to update category {}: {:?}", id, e);
            AppError::from(e)
        })?;

        let category = CategoryResponseDto::from(Category::from(categories.get(id).await?));
        tracing::info!("Category '{}' updated ({})", id, changed.join(", "));
        self.webhooks.dispatch(
            "category.updated",
            json!({ "category": &category, "changed": changed }),
        );

        Ok(category)
    }

    /// Soft-disable; `confirmed` carries the admin's explicit confirmation
    pub async fn disable(&self, id: &str, confirmed: bool) -> Result<CategoryResponseDto> {
        if !confirmed {
            return Err(AppError::BadRequest(
                "Disabling a category requires confirmation".to_string(),
            ));
        }

        let tree = self.load_tree().await?;
        let stored = tree
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", id)))?;
        if !stored.is_active() {
            return Err(AppError::Conflict(format!(
                "Category '{}' is already disabled",
                id
            )));
        }

        let active_orders = tree
            .iter()
            .filter(|c| c.is_active())
            .filter_map(|c| c.order);
        let patch = form::disable_patch(Utc::now(), active_orders);

        let categories = self.db.class(CATEGORY_CLASS);
        categories.update(id, &patch).await.map_err(|e| {
            tracing::error!("Failed to disable category {}: {:?}", id, e);
            AppError::from(e)
        })?;

        let category = CategoryResponseDto::from(Category::from(categories.get(id).await?));
        tracing::info!("Category '{}' disabled", id);
        self.webhooks
            .dispatch("category.disabled", json!({ "category": &category }));

        Ok(category)
    }

    async fn fetch(&self, id: &str) -> Result<Category> {
        let document = self.db.class(CATEGORY_CLASS).get(id).await?;
        Ok(Category::from(document))
    }
}

/// Map a tree check onto the accepted parent id or a user-facing error
fn resolve_parent(
    tree: &CategoryTree,
    category_id: Option<&str>,
    parent_id: Option<&str>,
) -> Result<Option<String>> {
    match tree.check_parent(category_id, parent_id) {
        ParentCheck::Detached => Ok(None),
        ParentCheck::Accepted(id) => Ok(Some(id)),
        ParentCheck::Cycle => Err(AppError::Validation(
            "A category cannot be moved under itself or one of its subcategories".to_string(),
        )),
        ParentCheck::UnknownParent => Err(AppError::NotFound(format!(
            "Parent category '{}' not found",
            parent_id.unwrap_or_default().trim()
        ))),
        ParentCheck::DisabledParent => Err(AppError::Validation(format!(
            "Parent category '{}' is disabled",
            parent_id.unwrap_or_default().trim()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WebhookConfig;
    use crate::modules::datastore::{FieldOp, MemoryStore, Pointer};
    use crate::shared::test_helpers::{seed_category, test_db};

    fn service(store: Arc<MemoryStore>) -> CategoryService {
        let db = test_db(store);
        let webhooks = WebhookRegistry::new(db.clone(), &WebhookConfig::default()).unwrap();
        CategoryService::new(db, Arc::new(webhooks))
    }

    fn form(name: &str, parent: Option<&str>) -> CategoryFormDto {
        CategoryFormDto {
            name: name.to_string(),
            parent_id: parent.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_list_in_tree_order() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());

        let parent = service.create(&form("Billing", None)).await.unwrap();
        let child = service
            .create(&form("Refunds", Some(&parent.id)))
            .await
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));

        let listed = service.list(false).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Billing", "Refunds"]);

        let tree = service.list_tree(false).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].name, "Refunds");
    }

    #[tokio::test]
    async fn test_update_rejects_cycle_and_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "a", "A", None, None).await;
        seed_category(&store, "b", "B", Some("a"), None).await;
        let service = service(store.clone());

        let err = service.update("a", &form("A", Some("b"))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let a = service.get("a").await.unwrap();
        assert_eq!(a.parent_id, None);
    }

    #[tokio::test]
    async fn test_update_clears_parent() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "a", "A", None, None).await;
        seed_category(&store, "b", "B", Some("a"), None).await;
        let service = service(store.clone());

        let updated = service.update("b", &form("B", None)).await.unwrap();
        assert_eq!(updated.parent_id, None);
        assert_eq!(updated.name, "B");
    }

    #[tokio::test]
    async fn test_update_keeps_disabled_parent_when_unchanged() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "p", "Parent", None, Some(1)).await;
        seed_category(&store, "c", "Child", Some("p"), Some(2)).await;
        let service = service(store);
        service.disable("p", true).await.unwrap();

        let mut dto = service.form("c").await.unwrap();
        dto.description = "Edited".to_string();
        let updated = service.update("c", &dto).await.unwrap();

        assert_eq!(updated.description.as_deref(), Some("Edited"));
        assert_eq!(updated.parent_id.as_deref(), Some("p"));

        // Once detached, picking the disabled parent again is a new selection
        let detached = service.update("c", &form("Child", Some("  "))).await.unwrap();
        assert_eq!(detached.parent_id, None);
        let err = service.update("c", &form("Child", Some("p"))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_missing_parent_when_unchanged() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "c", "Child", Some("gone"), None).await;
        let service = service(store);

        let mut dto = service.form("c").await.unwrap();
        assert_eq!(dto.parent_id.as_deref(), Some("gone"));
        dto.description = "Edited".to_string();
        let updated = service.update("c", &dto).await.unwrap();

        assert_eq!(updated.description.as_deref(), Some("Edited"));
        assert_eq!(updated.parent_id.as_deref(), Some("gone"));
    }

    #[tokio::test]
    async fn test_update_unknown_category_is_not_found() {
        let service = service(Arc::new(MemoryStore::new()));
        let err = service.update("nope", &form("X", None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_check_parent_outcomes() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "a", "A", None, Some(1)).await;
        seed_category(&store, "b", "B", Some("a"), Some(2)).await;
        let service = service(store);

        assert_eq!(service.check_parent(Some("b"), None).await.unwrap(), None);
        assert_eq!(
            service.check_parent(None, Some("b")).await.unwrap(),
            Some("b".to_string())
        );
        assert!(matches!(
            service.check_parent(Some("a"), Some("a")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.check_parent(Some("a"), Some("zzz")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_disable_requires_confirmation_and_moves_to_end() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "a", "A", None, Some(1)).await;
        seed_category(&store, "b", "B", None, Some(2)).await;
        let service = service(store);

        assert!(matches!(
            service.disable("a", false).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(service.get("a").await.unwrap().deleted_at.is_none());

        let disabled = service.disable("a", true).await.unwrap();
        assert!(disabled.disabled);
        assert!(disabled.order.unwrap() > 2);

        let active = service.list(false).await.unwrap();
        assert_eq!(active.len(), 1);
        let all = service.list(true).await.unwrap();
        assert_eq!(all.last().map(|c| c.id.as_str()), Some("a"));

        assert!(matches!(
            service.disable("a", true).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_parent_rejected_on_create() {
        let store = Arc::new(MemoryStore::new());
        seed_category(&store, "a", "A", None, None).await;
        let service = service(store);
        service.disable("a", true).await.unwrap();

        let err = service.create(&form("Child", Some("a"))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_form_round_trips_faq_ids() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store);

        let mut dto = form("FAQ backed", None);
        dto.faqs = "f1, f2,,".to_string();
        let created = service.create(&dto).await.unwrap();
        assert_eq!(created.faq_ids, vec!["f1", "f2"]);

        let loaded = service.form(&created.id).await.unwrap();
        assert_eq!(loaded.faqs, "f1,f2");

        // Keys written by an unchanged update
        let stored = Category::from(
            service
                .db
                .class(CATEGORY_CLASS)
                .get(&created.id)
                .await
                .unwrap(),
        );
        let patch = form::update_patch(&service.db, &stored, &loaded, None);
        assert_eq!(
            patch.get("FAQs"),
            Some(&FieldOp::Set(json!([
                Pointer::new("FAQ", "f1").to_value(),
                Pointer::new("FAQ", "f2").to_value()
            ])))
        );
    }
}
