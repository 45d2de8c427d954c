use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::model_to_campaign;
use super::retry;
use crate::errors::{PhishsimError, Result};
use crate::storage::models::{Campaign, CampaignStatus, NewCampaign};

use migration::entities::{campaign, campaign_target, email_event};

impl SeaOrmStorage {
    pub async fn create_campaign(&self, new: &NewCampaign) -> Result<Campaign> {
        let model = campaign::ActiveModel {
            name: Set(new.name.clone()),
            description: Set(new.description.clone()),
            template_id: Set(new.template_id),
            status: Set(CampaignStatus::Draft.to_string()),
            consent_verified: Set(false),
            created_by: Set(new.created_by),
            created_at: Set(Utc::now()),
            scheduled_at: Set(new.scheduled_at),
            started_at: Set(None),
            completed_at: Set(None),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.db)
            .await
            .map_err(|e| PhishsimError::database_operation(format!("创建活动失败: {}", e)))?;

        info!("Campaign created: {} ({})", inserted.id, inserted.name);
        model_to_campaign(inserted)
    }

    pub async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_campaign({})", id), self.retry_config, || {
            campaign::Entity::find_by_id(id).one(db)
        })
        .await?;

        model.map(model_to_campaign).transpose()
    }

    /// 不存在时返回 NotFound
    pub async fn require_campaign(&self, id: i64) -> Result<Campaign> {
        self.get_campaign(id)
            .await?
            .ok_or_else(|| PhishsimError::not_found(format!("Campaign {} not found", id)))
    }

    pub async fn list_campaigns(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let mut query = campaign::Entity::find()
            .order_by_desc(campaign::Column::CreatedAt)
            .order_by_desc(campaign::Column::Id);
        if let Some(status) = status {
            query = query.filter(campaign::Column::Status.eq(status.to_string()));
        }

        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_campaign)
            .collect()
    }

    pub async fn list_campaigns_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Campaign>> {
        campaign::Entity::find()
            .filter(campaign::Column::CreatedAt.gte(since))
            .order_by_desc(campaign::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_campaign)
            .collect()
    }

    pub async fn count_campaigns_using_template(&self, template_id: i64) -> Result<u64> {
        Ok(campaign::Entity::find()
            .filter(campaign::Column::TemplateId.eq(template_id))
            .count(&self.db)
            .await?)
    }

    pub async fn set_consent_verified(&self, id: i64) -> Result<Campaign> {
        let result = campaign::Entity::update_many()
            .col_expr(campaign::Column::ConsentVerified, Expr::value(true))
            .filter(campaign::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(PhishsimError::not_found(format!("Campaign {} not found", id)));
        }

        campaign_target::Entity::update_many()
            .col_expr(campaign_target::Column::ConsentGiven, Expr::value(true))
            .filter(campaign_target::Column::CampaignId.eq(id))
            .exec(&self.db)
            .await?;

        self.require_campaign(id).await
    }

    /// 条件状态迁移：仅当当前状态属于 `from` 时更新。
    ///
    /// 返回是否发生了迁移。draft → active 记录 `started_at`，
    /// 进入 completed 记录 `completed_at`。
    pub async fn transition_campaign_status(
        &self,
        id: i64,
        from: &[CampaignStatus],
        to: CampaignStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut update = campaign::Entity::update_many()
            .col_expr(campaign::Column::Status, Expr::value(to.to_string()))
            .filter(campaign::Column::Id.eq(id))
            .filter(campaign::Column::Status.is_in(from.iter().map(|s| s.to_string())));

        match to {
            CampaignStatus::Active if from.contains(&CampaignStatus::Draft) => {
                update = update.col_expr(campaign::Column::StartedAt, Expr::value(at));
            }
            CampaignStatus::Completed => {
                update = update.col_expr(campaign::Column::CompletedAt, Expr::value(at));
            }
            _ => {}
        }

        let result = update.exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    /// 删除活动及其收件人与事件（事务内显式删除，不依赖后端的级联设置）
    pub async fn delete_campaign(&self, id: i64) -> Result<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PhishsimError::database_operation(format!("开始事务失败: {}", e)))?;

        let ct_ids: Vec<i64> = campaign_target::Entity::find()
            .select_only()
            .column(campaign_target::Column::Id)
            .filter(campaign_target::Column::CampaignId.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        for chunk in ct_ids.chunks(500) {
            email_event::Entity::delete_many()
                .filter(email_event::Column::CampaignTargetId.is_in(chunk.to_vec()))
                .exec(&txn)
                .await?;
        }

        campaign_target::Entity::delete_many()
            .filter(campaign_target::Column::CampaignId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = campaign::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit()
            .await
            .map_err(|e| PhishsimError::database_operation(format!("提交事务失败: {}", e)))?;

        if deleted.rows_affected > 0 {
            self.invalidate_token_cache();
            info!(
                "Campaign {} deleted with {} recipients",
                id,
                ct_ids.len()
            );
        }
        Ok(deleted.rows_affected > 0)
    }

    /// completed 且 `completed_at < cutoff` 的活动
    pub async fn completed_campaign_ids_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>> {
        Ok(campaign::Entity::find()
            .select_only()
            .column(campaign::Column::Id)
            .filter(campaign::Column::Status.eq(CampaignStatus::Completed.to_string()))
            .filter(campaign::Column::CompletedAt.lt(cutoff))
            .into_tuple()
            .all(&self.db)
            .await?)
    }
}
