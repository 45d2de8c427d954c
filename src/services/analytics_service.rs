//! Analytics service layer
//!
//! 负责加载收件人与事件，计算交给 `crate::analytics` 中的纯函数。
//! 指标在 Rust 中计算，与数据库方言无关。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{
    CampaignMetrics, DepartmentMetrics, Granularity, TimeToEngagement, TimelinePoint,
    build_timeline, compute_metrics, metrics_by_department, time_to_engagement,
};
use crate::errors::Result;
use crate::storage::{CampaignStatus, EventCounts, SeaOrmStorage};

/// 活动汇总的时间窗口
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl ActivityRange {
    pub fn days(self) -> i64 {
        match self {
            ActivityRange::Week => 7,
            ActivityRange::Month => 30,
            ActivityRange::Quarter => 90,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveCampaignMetrics {
    pub campaign_id: i64,
    pub name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub metrics: CampaignMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformOverview {
    pub total_campaigns: u64,
    pub campaigns_by_status: BTreeMap<String, u64>,
    pub total_events: u64,
    pub events_by_type: EventCounts,
    pub active_campaigns: Vec<ActiveCampaignMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub range: ActivityRange,
    pub since: DateTime<Utc>,
    pub events_by_type: EventCounts,
    pub campaigns_created: u64,
    pub campaigns_by_status: BTreeMap<String, u64>,
}

#[derive(Clone)]
pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 活动指标，可按部门过滤（`Unassigned` 表示未填写部门）
    pub async fn campaign_metrics(
        &self,
        campaign_id: i64,
        department: Option<&str>,
    ) -> Result<CampaignMetrics> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, department)
            .await?;
        Ok(compute_metrics(&recipients))
    }

    pub async fn campaign_timeline(
        &self,
        campaign_id: i64,
        granularity: Granularity,
        department: Option<&str>,
    ) -> Result<Vec<TimelinePoint>> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, department)
            .await?;
        let points = build_timeline(recipients.iter().flat_map(|r| r.events.iter()), granularity);
        debug!(
            "Timeline for campaign {}: {} buckets ({:?})",
            campaign_id,
            points.len(),
            granularity
        );
        Ok(points)
    }

    pub async fn department_performance(&self, campaign_id: i64) -> Result<Vec<DepartmentMetrics>> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, None)
            .await?;
        Ok(metrics_by_department(&recipients))
    }

    pub async fn time_to_engagement(
        &self,
        campaign_id: i64,
        department: Option<&str>,
    ) -> Result<TimeToEngagement> {
        self.storage.require_campaign(campaign_id).await?;
        let recipients = self
            .storage
            .load_recipient_activity(campaign_id, department)
            .await?;
        Ok(time_to_engagement(&recipients))
    }

    pub async fn platform_overview(&self) -> Result<PlatformOverview> {
        let campaigns = self.storage.list_campaigns(None).await?;
        let events_by_type = self.storage.count_events_by_type(None).await?;

        let mut campaigns_by_status = empty_status_counts();
        for campaign in &campaigns {
            *campaigns_by_status
                .entry(campaign.status.to_string())
                .or_insert(0) += 1;
        }

        let mut active_campaigns = Vec::new();
        for campaign in campaigns
            .iter()
            .filter(|c| c.status == CampaignStatus::Active)
        {
            let recipients = self
                .storage
                .load_recipient_activity(campaign.id, None)
                .await?;
            active_campaigns.push(ActiveCampaignMetrics {
                campaign_id: campaign.id,
                name: campaign.name.clone(),
                started_at: campaign.started_at,
                metrics: compute_metrics(&recipients),
            });
        }

        Ok(PlatformOverview {
            total_campaigns: campaigns.len() as u64,
            campaigns_by_status,
            total_events: events_by_type.total(),
            events_by_type,
            active_campaigns,
        })
    }

    pub async fn activity_summary(&self, range: ActivityRange) -> Result<ActivitySummary> {
        let since = Utc::now() - Duration::days(range.days());
        let events_by_type = self.storage.count_events_by_type(Some(since)).await?;
        let created = self.storage.list_campaigns_created_since(since).await?;

        let mut campaigns_by_status = empty_status_counts();
        for campaign in &created {
            *campaigns_by_status
                .entry(campaign.status.to_string())
                .or_insert(0) += 1;
        }

        Ok(ActivitySummary {
            range,
            since,
            events_by_type,
            campaigns_created: created.len() as u64,
            campaigns_by_status,
        })
    }
}

fn empty_status_counts() -> BTreeMap<String, u64> {
    use strum::IntoEnumIterator;
    CampaignStatus::iter().map(|s| (s.to_string(), 0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_parsing() {
        let range: ActivityRange = serde_json::from_str("\"7d\"").unwrap();
        assert_eq!(range, ActivityRange::Week);
        assert_eq!(range.days(), 7);
        assert_eq!(ActivityRange::default().days(), 30);
        assert!(serde_json::from_str::<ActivityRange>("\"1y\"").is_err());
    }

    #[test]
    fn test_status_counts_cover_every_status() {
        let counts = empty_status_counts();
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|v| *v == 0));
        assert!(counts.contains_key("paused"));
    }
}
