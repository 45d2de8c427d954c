use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr,
};
use tracing::trace;

use super::SeaOrmStorage;
use super::converters::{model_to_campaign_target, model_to_target};
use super::retry;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::{CampaignTarget, EventType, RecipientActivity, TokenBinding};

use migration::entities::{campaign_target, target};

/// 部门为空的目标在统计中归入此分组
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

pub async fn insert_campaign_target<C: ConnectionTrait>(
    conn: &C,
    campaign_id: i64,
    target_id: i64,
    token: &str,
    consent_given: bool,
) -> Result<CampaignTarget> {
    let model = campaign_target::ActiveModel {
        campaign_id: Set(campaign_id),
        target_id: Set(target_id),
        unique_token: Set(token.to_string()),
        consent_given: Set(consent_given),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    match model.insert(conn).await {
        Ok(inserted) => Ok(model_to_campaign_target(inserted)),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(PhishsimError::conflict(format!(
                "Campaign {} already has a token for target {}",
                campaign_id, target_id
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_campaign_target_by_pair<C: ConnectionTrait>(
    conn: &C,
    campaign_id: i64,
    target_id: i64,
) -> Result<Option<CampaignTarget>> {
    Ok(campaign_target::Entity::find()
        .filter(campaign_target::Column::CampaignId.eq(campaign_id))
        .filter(campaign_target::Column::TargetId.eq(target_id))
        .one(conn)
        .await?
        .map(model_to_campaign_target))
}

impl SeaOrmStorage {
    /// token 解析（命中缓存时不查库，未知 token 不缓存）
    pub async fn resolve_token(&self, token: &str) -> Result<Option<TokenBinding>> {
        if let Some(binding) = self.token_cache.get(token) {
            trace!("Token cache hit");
            return Ok(Some(binding));
        }

        let db = &self.db;
        let model = retry::with_retry("resolve_token", self.retry_config, || {
            campaign_target::Entity::find()
                .filter(campaign_target::Column::UniqueToken.eq(token))
                .one(db)
        })
        .await?;

        let binding = model.map(|m| TokenBinding {
            campaign_target_id: m.id,
            campaign_id: m.campaign_id,
            target_id: m.target_id,
        });
        if let Some(binding) = binding {
            self.token_cache.insert(token.to_string(), binding);
        }
        Ok(binding)
    }

    pub async fn get_campaign_target(&self, id: i64) -> Result<Option<CampaignTarget>> {
        Ok(campaign_target::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_campaign_target))
    }

    pub async fn list_campaign_targets(&self, campaign_id: i64) -> Result<Vec<CampaignTarget>> {
        Ok(campaign_target::Entity::find()
            .filter(campaign_target::Column::CampaignId.eq(campaign_id))
            .order_by_asc(campaign_target::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_campaign_target)
            .collect())
    }

    pub async fn count_campaign_targets(&self, campaign_id: i64) -> Result<u64> {
        Ok(campaign_target::Entity::find()
            .filter(campaign_target::Column::CampaignId.eq(campaign_id))
            .count(&self.db)
            .await?)
    }

    /// 活动内每个收件人的目标信息与事件（事件按时间、id 升序）
    ///
    /// `department` 为 `Unassigned` 时匹配部门为空的目标。
    pub async fn load_recipient_activity(
        &self,
        campaign_id: i64,
        department: Option<&str>,
    ) -> Result<Vec<RecipientActivity>> {
        let links = self.list_campaign_targets(campaign_id).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let target_ids: Vec<i64> = links.iter().map(|ct| ct.target_id).collect();
        let mut targets = HashMap::with_capacity(target_ids.len());
        for chunk in target_ids.chunks(500) {
            for model in target::Entity::find()
                .filter(target::Column::Id.is_in(chunk.to_vec()))
                .all(&self.db)
                .await?
            {
                targets.insert(model.id, model_to_target(model));
            }
        }

        let links: Vec<CampaignTarget> = links
            .into_iter()
            .filter(|ct| match (department, targets.get(&ct.target_id)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(wanted), Some(t)) => {
                    t.department.as_deref().unwrap_or(UNASSIGNED_DEPARTMENT) == wanted
                }
            })
            .collect();

        let ct_ids: Vec<i64> = links.iter().map(|ct| ct.id).collect();
        let mut events = self.events_by_campaign_target(&ct_ids).await?;

        Ok(links
            .into_iter()
            .filter_map(|ct| {
                let target = targets.remove(&ct.target_id)?;
                let events = events.remove(&ct.id).unwrap_or_default();
                Some(RecipientActivity {
                    campaign_target: ct,
                    target,
                    events,
                })
            })
            .collect())
    }

    /// 尚未发送（没有 sent/bounced 事件）的收件人
    pub async fn pending_campaign_target_ids(&self, campaign_id: i64) -> Result<Vec<i64>> {
        let links = self.list_campaign_targets(campaign_id).await?;
        let ct_ids: Vec<i64> = links.iter().map(|ct| ct.id).collect();
        let events = self.events_by_campaign_target(&ct_ids).await?;

        let dispatched: HashSet<i64> = events
            .iter()
            .filter(|(_, evs)| {
                evs.iter()
                    .any(|e| matches!(e.event_type, EventType::Sent | EventType::Bounced))
            })
            .map(|(id, _)| *id)
            .collect();

        Ok(ct_ids
            .into_iter()
            .filter(|id| !dispatched.contains(id))
            .collect())
    }
}
