use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, QueryOrder};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_template;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::{EmailTemplate, TemplateDraft};

use migration::entities::template;

impl SeaOrmStorage {
    pub async fn create_template(
        &self,
        draft: &TemplateDraft,
        created_by: Option<i64>,
    ) -> Result<EmailTemplate> {
        let now = Utc::now();
        let model = template::ActiveModel {
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            subject: Set(draft.subject.clone()),
            html_content: Set(draft.html_content.clone()),
            is_active: Set(draft.is_active),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        info!("Template created: {} ({})", inserted.id, inserted.name);
        Ok(model_to_template(inserted))
    }

    pub async fn get_template(&self, id: i64) -> Result<Option<EmailTemplate>> {
        Ok(template::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_template))
    }

    pub async fn require_template(&self, id: i64) -> Result<EmailTemplate> {
        self.get_template(id)
            .await?
            .ok_or_else(|| PhishsimError::not_found(format!("Template {} not found", id)))
    }

    pub async fn list_templates(&self) -> Result<Vec<EmailTemplate>> {
        Ok(template::Entity::find()
            .order_by_desc(template::Column::CreatedAt)
            .order_by_desc(template::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_template)
            .collect())
    }

    pub async fn update_template(&self, id: i64, draft: &TemplateDraft) -> Result<EmailTemplate> {
        let existing = template::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| PhishsimError::not_found(format!("Template {} not found", id)))?;

        let mut active: template::ActiveModel = existing.into();
        active.name = Set(draft.name.clone());
        active.description = Set(draft.description.clone());
        active.subject = Set(draft.subject.clone());
        active.html_content = Set(draft.html_content.clone());
        active.is_active = Set(draft.is_active);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(model_to_template(updated))
    }

    pub async fn delete_template(&self, id: i64) -> Result<bool> {
        let result = template::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
