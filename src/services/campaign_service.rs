//! Campaign service
//!
//! 活动生命周期、同意校验、目标导入/添加与结果导出。
//! 状态迁移使用条件更新，并发请求下只有一个能成功。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::analytics::{CampaignMetrics, FirstEvents, RecipientStage, compute_metrics};
use crate::errors::{PhishsimError, Result};
use crate::storage::backend::{find_campaign_target_by_pair, find_or_create_target};
use crate::storage::{
    Campaign, CampaignStatus, CampaignTarget, NewCampaign, NewTarget, SeaOrmStorage, Target,
};
use crate::utils::csv_handler::{ExportRow, parse_target_csv};

use super::audit_service::{Actor, AuditAction, AuditService};
use super::import_validation::{RejectedRow, validate_target, validate_target_rows};
use super::mail::MailQueue;
use super::token_issuer::issue_on;

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 100;

const ALREADY_TARGETED: &str = "Email is already a target of this campaign";

const DIRECTORY_PAGE_SIZE: u64 = 50;

/// 目标目录查询；默认只列出启用的目标
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetSearch {
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub created_count: usize,
    pub rejected_rows: Vec<RejectedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub template_name: Option<String>,
    pub metrics: CampaignMetrics,
}

/// 收件人列表中的一行
#[derive(Debug, Clone, Serialize)]
pub struct RecipientSummary {
    pub campaign_target_id: i64,
    pub target: Target,
    pub consent_given: bool,
    pub status: RecipientStage,
    pub sent_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CampaignService {
    storage: Arc<SeaOrmStorage>,
    audit: AuditService,
    mail_queue: Option<MailQueue>,
    consent_required: bool,
}

impl CampaignService {
    pub fn new(storage: Arc<SeaOrmStorage>, consent_required: bool) -> Self {
        Self {
            audit: AuditService::new(storage.clone()),
            storage,
            mail_queue: None,
            consent_required,
        }
    }

    pub fn with_mail_queue(mut self, queue: MailQueue) -> Self {
        self.mail_queue = Some(queue);
        self
    }

    pub async fn list(&self, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        self.storage.list_campaigns(status).await
    }

    pub async fn get(&self, id: i64) -> Result<Campaign> {
        self.storage.require_campaign(id).await
    }

    pub async fn detail(&self, id: i64) -> Result<CampaignDetail> {
        let campaign = self.storage.require_campaign(id).await?;
        let template_name = self
            .storage
            .get_template(campaign.template_id)
            .await?
            .map(|t| t.name);
        let recipients = self.storage.load_recipient_activity(id, None).await?;

        Ok(CampaignDetail {
            campaign,
            template_name,
            metrics: compute_metrics(&recipients),
        })
    }

    pub async fn create(&self, mut new: NewCampaign, actor: &Actor) -> Result<Campaign> {
        new.name = new.name.trim().to_string();
        let name_len = new.name.chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name_len) {
            return Err(PhishsimError::validation(format!(
                "Campaign name must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            )));
        }
        if self.storage.get_template(new.template_id).await?.is_none() {
            return Err(PhishsimError::validation(format!(
                "Template {} does not exist",
                new.template_id
            )));
        }
        new.description = new
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        new.created_by = actor.user_id;

        let campaign = self.storage.create_campaign(&new).await?;
        self.audit
            .log(
                actor,
                AuditAction::CampaignCreated,
                Some(("campaign", campaign.id)),
                Some(json!({
                    "name": campaign.name,
                    "template_id": campaign.template_id,
                })),
            )
            .await;
        Ok(campaign)
    }

    pub async fn verify_consent(&self, id: i64, actor: &Actor) -> Result<Campaign> {
        let campaign = self.storage.require_campaign(id).await?;
        if campaign.status == CampaignStatus::Completed {
            return Err(PhishsimError::invalid_state(
                "Consent cannot be changed on a completed campaign",
            ));
        }

        let campaign = self.storage.set_consent_verified(id).await?;
        self.audit
            .log(
                actor,
                AuditAction::ConsentVerified,
                Some(("campaign", id)),
                Some(json!({ "name": campaign.name })),
            )
            .await;
        Ok(campaign)
    }

    /// draft → active，并把所有待发送收件人放入发信队列
    pub async fn send(&self, id: i64, actor: &Actor) -> Result<Campaign> {
        let campaign = self.storage.require_campaign(id).await?;
        if campaign.status != CampaignStatus::Draft {
            return Err(PhishsimError::invalid_state(format!(
                "Only draft campaigns can be sent (current status: {})",
                campaign.status
            )));
        }

        let target_count = self.storage.count_campaign_targets(id).await?;
        if target_count == 0 {
            return Err(PhishsimError::validation("Campaign has no targets"));
        }
        if self.consent_required && !campaign.consent_verified {
            return Err(PhishsimError::consent_required(
                "Consent must be verified before sending this campaign",
            ));
        }

        self.transition(id, &[CampaignStatus::Draft], CampaignStatus::Active)
            .await?;
        let queued = self.enqueue_pending(id).await?;

        self.audit
            .log(
                actor,
                AuditAction::CampaignStarted,
                Some(("campaign", id)),
                Some(json!({ "target_count": target_count, "queued": queued })),
            )
            .await;
        info!("Campaign {} started, {} emails queued", id, queued);
        self.storage.require_campaign(id).await
    }

    pub async fn pause(&self, id: i64, actor: &Actor) -> Result<Campaign> {
        self.storage.require_campaign(id).await?;
        self.transition(id, &[CampaignStatus::Active], CampaignStatus::Paused)
            .await?;
        self.audit
            .log(actor, AuditAction::CampaignPaused, Some(("campaign", id)), None)
            .await;
        self.storage.require_campaign(id).await
    }

    /// paused → active，重新放入尚未发送的收件人
    pub async fn resume(&self, id: i64, actor: &Actor) -> Result<Campaign> {
        self.storage.require_campaign(id).await?;
        self.transition(id, &[CampaignStatus::Paused], CampaignStatus::Active)
            .await?;
        let queued = self.enqueue_pending(id).await?;

        self.audit
            .log(
                actor,
                AuditAction::CampaignResumed,
                Some(("campaign", id)),
                Some(json!({ "queued": queued })),
            )
            .await;
        self.storage.require_campaign(id).await
    }

    pub async fn complete(&self, id: i64, actor: &Actor) -> Result<Campaign> {
        self.storage.require_campaign(id).await?;
        self.transition(
            id,
            &[CampaignStatus::Active, CampaignStatus::Paused],
            CampaignStatus::Completed,
        )
        .await?;
        self.audit
            .log(
                actor,
                AuditAction::CampaignCompleted,
                Some(("campaign", id)),
                None,
            )
            .await;
        self.storage.require_campaign(id).await
    }

    /// 删除活动（连同收件人与事件）；进行中的活动需先暂停或完成
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<()> {
        let campaign = self.storage.require_campaign(id).await?;
        if campaign.status == CampaignStatus::Active {
            return Err(PhishsimError::invalid_state(
                "Active campaigns must be paused or completed before deletion",
            ));
        }

        if !self.storage.delete_campaign(id).await? {
            return Err(PhishsimError::not_found(format!("Campaign {} not found", id)));
        }

        self.audit
            .log(
                actor,
                AuditAction::CampaignDeleted,
                Some(("campaign", id)),
                Some(json!({ "name": campaign.name })),
            )
            .await;
        Ok(())
    }

    /// 手工添加单个目标
    pub async fn add_target(
        &self,
        campaign_id: i64,
        target: NewTarget,
        actor: &Actor,
    ) -> Result<(Target, CampaignTarget)> {
        let campaign = self.storage.require_campaign(campaign_id).await?;
        ensure_accepts_targets(&campaign)?;
        let target = validate_target(target)?;

        let txn = self.storage.get_db().begin().await?;
        let (target, _) = find_or_create_target(&txn, &target).await?;
        if find_campaign_target_by_pair(&txn, campaign_id, target.id)
            .await?
            .is_some()
        {
            return Err(PhishsimError::conflict(ALREADY_TARGETED));
        }
        let (ct, _) = issue_on(&txn, campaign_id, target.id, campaign.consent_verified).await?;
        txn.commit().await?;

        self.audit
            .log(
                actor,
                AuditAction::TargetAdded,
                Some(("campaign", campaign_id)),
                Some(json!({ "email": target.email })),
            )
            .await;
        Ok((target, ct))
    }

    /// 从 CSV 导入目标
    ///
    /// 所有通过校验的行在同一事务中写入；数据库错误时整体回滚。
    pub async fn import_targets(
        &self,
        campaign_id: i64,
        data: &[u8],
        actor: &Actor,
    ) -> Result<ImportReport> {
        let campaign = self.storage.require_campaign(campaign_id).await?;
        ensure_accepts_targets(&campaign)?;

        let parsed = parse_target_csv(data)?;
        let total_rows = parsed.len();
        let (accepted, mut rejected_rows) = validate_target_rows(parsed);

        let txn = self.storage.get_db().begin().await?;
        let mut created_count = 0usize;
        for row in accepted {
            let (target, _) = find_or_create_target(&txn, &row.target).await?;
            if find_campaign_target_by_pair(&txn, campaign_id, target.id)
                .await?
                .is_some()
            {
                rejected_rows.push(RejectedRow {
                    row: row.row,
                    email: target.email,
                    reason: ALREADY_TARGETED.to_string(),
                });
                continue;
            }
            issue_on(&txn, campaign_id, target.id, campaign.consent_verified).await?;
            created_count += 1;
        }
        txn.commit().await?;

        rejected_rows.sort_by_key(|r| r.row);

        info!(
            "Imported {} of {} rows into campaign {} ({} rejected)",
            created_count,
            total_rows,
            campaign_id,
            rejected_rows.len()
        );
        self.audit
            .log(
                actor,
                AuditAction::TargetsImported,
                Some(("campaign", campaign_id)),
                Some(json!({
                    "created_count": created_count,
                    "rejected_count": rejected_rows.len(),
                })),
            )
            .await;

        Ok(ImportReport {
            created_count,
            rejected_rows,
        })
    }

    /// 所有活动共用的目标目录，每页 50 条，`page` 从 1 开始
    pub async fn target_directory(&self, query: &TargetSearch) -> Result<Vec<Target>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let page = query.page.unwrap_or(1).max(1);
        self.storage
            .search_targets(
                search,
                !query.include_inactive,
                DIRECTORY_PAGE_SIZE,
                (page - 1).saturating_mul(DIRECTORY_PAGE_SIZE),
            )
            .await
    }

    pub async fn recipients(&self, campaign_id: i64) -> Result<Vec<RecipientSummary>> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, None)
            .await?;

        Ok(recipients
            .into_iter()
            .map(|r| {
                let first = FirstEvents::from_events(&r.events);
                RecipientSummary {
                    campaign_target_id: r.campaign_target.id,
                    consent_given: r.campaign_target.consent_given,
                    target: r.target,
                    status: first.stage(),
                    sent_at: first.sent,
                    opened_at: first.opened,
                    clicked_at: first.clicked,
                    submitted_at: first.submitted,
                }
            })
            .collect())
    }

    /// 导出行（每个收件人一行，按加入顺序）
    pub async fn export_rows(&self, campaign_id: i64, actor: &Actor) -> Result<Vec<ExportRow>> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, None)
            .await?;
        let rows: Vec<ExportRow> = recipients.iter().map(ExportRow::from).collect();

        self.audit
            .log(
                actor,
                AuditAction::CampaignExported,
                Some(("campaign", campaign_id)),
                Some(json!({ "row_count": rows.len() })),
            )
            .await;
        Ok(rows)
    }

    async fn transition(
        &self,
        id: i64,
        from: &[CampaignStatus],
        to: CampaignStatus,
    ) -> Result<()> {
        if self
            .storage
            .transition_campaign_status(id, from, to, Utc::now())
            .await?
        {
            return Ok(());
        }

        let current = self.storage.require_campaign(id).await?;
        Err(PhishsimError::invalid_state(format!(
            "Cannot move campaign from {} to {}",
            current.status, to
        )))
    }

    /// 启动时把所有 active 活动中未发送的收件人重新入队
    ///
    /// 队列只在内存中，进程重启会丢失未处理的任务。
    pub async fn requeue_active(&self) -> Result<usize> {
        let mut total = 0;
        for campaign in self.storage.list_campaigns(Some(CampaignStatus::Active)).await? {
            total += self.enqueue_pending(campaign.id).await?;
        }
        Ok(total)
    }

    async fn enqueue_pending(&self, id: i64) -> Result<usize> {
        let Some(queue) = &self.mail_queue else {
            warn!("No mail queue attached, campaign {} emails not queued", id);
            return Ok(0);
        };
        let pending = self.storage.pending_campaign_target_ids(id).await?;
        queue.enqueue_all(&pending)
    }
}

fn ensure_accepts_targets(campaign: &Campaign) -> Result<()> {
    match campaign.status {
        CampaignStatus::Draft | CampaignStatus::Paused => Ok(()),
        status => Err(PhishsimError::invalid_state(format!(
            "Targets cannot be added to a {} campaign",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(status: CampaignStatus) -> Campaign {
        Campaign {
            id: 1,
            name: "Drill".to_string(),
            description: None,
            template_id: 1,
            status,
            consent_verified: false,
            created_by: None,
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_targets_only_added_before_launch_or_while_paused() {
        assert!(ensure_accepts_targets(&campaign(CampaignStatus::Draft)).is_ok());
        assert!(ensure_accepts_targets(&campaign(CampaignStatus::Paused)).is_ok());
        assert!(matches!(
            ensure_accepts_targets(&campaign(CampaignStatus::Active)),
            Err(PhishsimError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_accepts_targets(&campaign(CampaignStatus::Completed)),
            Err(PhishsimError::InvalidState(_))
        ));
    }
}
