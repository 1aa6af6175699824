use std::collections::HashMap;

use crate::core::error::Result;
use crate::features::categories::models::Category;
use crate::features::rules::dtos::{InvalidTriggerDto, TriggerValidationDto};
use crate::features::rules::models::{fields, raw_title, Trigger, TriggerError};
use crate::modules::datastore::{Db, Document, Patch, Query};
use crate::shared::constants::{CATEGORY_CLASS, TRIGGER_CLASS};

/// Validates automation triggers against the current categories
pub struct TriggerService {
    db: Db,
}

impl TriggerService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Check every active trigger and deactivate the invalid ones
    pub async fn validate_all(&self) -> Result<TriggerValidationDto> {
        let triggers = self
            .db
            .class(TRIGGER_CLASS)
            .find(&Query::new().equal_to(fields::ACTIVE, true))
            .await?;

        // id -> active
        let categories: HashMap<String, bool> = self
            .db
            .class(CATEGORY_CLASS)
            .find(&Query::new())
            .await?
            .into_iter()
            .map(Category::from)
            .map(|c| {
                let active = c.is_active();
                (c.id, active)
            })
            .collect();

        let mut summary = TriggerValidationDto::default();
        for doc in &triggers {
            match validate(doc, &categories) {
                Ok(_) => summary.success += 1,
                Err(reason) => {
                    summary.fail += 1;
                    tracing::warn!(
                        "Trigger '{}' ({}) is invalid and will be deactivated: {}",
                        doc.id,
                        raw_title(doc),
                        reason
                    );
                    self.deactivate(&doc.id).await;
                    summary.invalid.push(InvalidTriggerDto {
                        id: doc.id.clone(),
                        title: raw_title(doc),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Failures are logged; the validation pass carries on
    async fn deactivate(&self, id: &str) {
        if let Err(e) = self
            .db
            .class(TRIGGER_CLASS)
            .update(id, &Patch::new().set(fields::ACTIVE, false))
            .await
        {
            tracing::error!("Failed to deactivate trigger {}: {:?}", id, e);
        }
    }
}

fn validate(doc: &Document, categories: &HashMap<String, bool>) -> std::result::Result<Trigger, TriggerError> {
    let trigger = Trigger::from_document(doc)?;
    trigger.check()?;

    for id in trigger.category_ids() {
        match categories.get(id) {
            None => return Err(TriggerError::UnknownCategory(id.to_string())),
            Some(false) => return Err(TriggerError::DisabledCategory(id.to_string())),
            Some(true) => {}
        }
    }

    Ok(trigger)
}
