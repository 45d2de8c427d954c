use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use super::SeaOrmStorage;
use super::converters::model_to_audit_entry;
use crate::errors::Result;
use crate::storage::models::AuditEntry;

use migration::entities::audit_log;

/// 待写入的审计记录
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

impl SeaOrmStorage {
    pub async fn insert_audit_entry(&self, entry: &NewAuditEntry) -> Result<AuditEntry> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let model = audit_log::ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action.clone()),
            resource_type: Set(entry.resource_type.clone()),
            resource_id: Set(entry.resource_id),
            details: Set(details),
            ip_address: Set(entry.ip_address.clone()),
            timestamp: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        Ok(model_to_audit_entry(inserted))
    }

    /// 最近的审计记录（时间倒序）
    pub async fn list_audit_entries(
        &self,
        since: Option<DateTime<Utc>>,
        action: Option<&str>,
        limit: u64,
    ) -> Result<Vec<AuditEntry>> {
        let mut query = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::Timestamp)
            .order_by_desc(audit_log::Column::Id)
            .limit(limit);
        if let Some(since) = since {
            query = query.filter(audit_log::Column::Timestamp.gte(since));
        }
        if let Some(action) = action {
            query = query.filter(audit_log::Column::Action.eq(action));
        }

        Ok(query
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_audit_entry)
            .collect())
    }
}
