//! email_events 读写
//!
//! 事件只追加、不修改；读取时按 (timestamp, id) 升序，保证同一时间戳下
//! 先写入的事件排在前面。

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::model_to_event;
use super::retry;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::{EmailEvent, EventType, NewEvent};

use migration::entities::email_event;

#[derive(Debug, FromQueryResult)]
struct EventTypeCountRow {
    event_type: String,
    count: i64,
}

/// 按事件类型计数（包含重复事件）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts(pub BTreeMap<EventType, u64>);

impl EventCounts {
    pub fn get(&self, event_type: EventType) -> u64 {
        self.0.get(&event_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl SeaOrmStorage {
    /// 追加一条事件，SQLite BUSY 等瞬时错误会重试
    pub async fn insert_event(&self, event: &NewEvent) -> Result<EmailEvent> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let db = &self.db;
        let inserted = retry::with_retry("insert_event", self.retry_config, || {
            let model = email_event::ActiveModel {
                campaign_target_id: Set(event.campaign_target_id),
                event_type: Set(event.event_type.to_string()),
                timestamp: Set(event.timestamp),
                ip_address: Set(event.ip_address.clone()),
                user_agent: Set(event.user_agent.clone()),
                metadata: Set(metadata.clone()),
                ..Default::default()
            };
            model.insert(db)
        })
        .await
        .map_err(|e| PhishsimError::database_operation(format!("写入事件失败: {}", e)))?;

        model_to_event(inserted).ok_or_else(|| {
            PhishsimError::database_operation("inserted event has unknown type".to_string())
        })
    }

    /// 按收件人分组的事件
    pub async fn events_by_campaign_target(
        &self,
        campaign_target_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<EmailEvent>>> {
        let mut grouped: HashMap<i64, Vec<EmailEvent>> = HashMap::new();

        for chunk in campaign_target_ids.chunks(500) {
            let models = email_event::Entity::find()
                .filter(email_event::Column::CampaignTargetId.is_in(chunk.to_vec()))
                .order_by_asc(email_event::Column::Timestamp)
                .order_by_asc(email_event::Column::Id)
                .all(&self.db)
                .await?;

            for event in models.into_iter().filter_map(model_to_event) {
                grouped
                    .entry(event.campaign_target_id)
                    .or_default()
                    .push(event);
            }
        }

        Ok(grouped)
    }

    /// 事件类型计数，`since` 为空时统计全部
    pub async fn count_events_by_type(&self, since: Option<DateTime<Utc>>) -> Result<EventCounts> {
        let mut query = email_event::Entity::find()
            .select_only()
            .column(email_event::Column::EventType)
            .column_as(email_event::Column::Id.count(), "count")
            .group_by(email_event::Column::EventType);
        if let Some(since) = since {
            query = query.filter(email_event::Column::Timestamp.gte(since));
        }

        let rows = query
            .into_model::<EventTypeCountRow>()
            .all(&self.db)
            .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            match row.event_type.parse::<EventType>() {
                Ok(t) => {
                    counts.insert(t, row.count.max(0) as u64);
                }
                Err(_) => debug!("Ignoring unknown event type '{}'", row.event_type),
            }
        }
        Ok(EventCounts(counts))
    }

    pub async fn count_events_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        Ok(email_event::Entity::find()
            .filter(email_event::Column::Timestamp.lt(cutoff))
            .count(&self.db)
            .await?)
    }

    /// 分批删除 `timestamp < cutoff` 的事件，返回删除行数
    pub async fn delete_events_before(&self, cutoff: DateTime<Utc>, batch_size: u64) -> Result<u64> {
        let mut total_deleted = 0u64;

        loop {
            let ids: Vec<i64> = email_event::Entity::find()
                .select_only()
                .column(email_event::Column::Id)
                .filter(email_event::Column::Timestamp.lt(cutoff))
                .order_by_asc(email_event::Column::Id)
                .limit(batch_size)
                .into_tuple()
                .all(&self.db)
                .await?;

            if ids.is_empty() {
                break;
            }

            let deleted = email_event::Entity::delete_many()
                .filter(email_event::Column::Id.is_in(ids))
                .exec(&self.db)
                .await?
                .rows_affected;

            total_deleted += deleted;
            debug!(
                "Event purge batch: deleted {} rows (total {})",
                deleted, total_deleted
            );

            if deleted < batch_size {
                break;
            }
        }

        Ok(total_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_counts_missing_type_is_zero() {
        let mut map = BTreeMap::new();
        map.insert(EventType::Opened, 3);
        map.insert(EventType::Sent, 5);
        let counts = EventCounts(map);

        assert_eq!(counts.get(EventType::Opened), 3);
        assert_eq!(counts.get(EventType::Submitted), 0);
        assert_eq!(counts.total(), 8);
    }
}
