//! 合规报告：近 30 天审计记录、活动同意情况与超过保留期的事件数量

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::errors::Result;
use crate::storage::{AuditEntry, SeaOrmStorage};

use super::audit_service::AuditService;

const REPORT_WINDOW_DAYS: i64 = 30;
const REPORT_AUDIT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsentBreakdown {
    pub verified: u64,
    pub not_verified: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub audit_logs: Vec<AuditEntry>,
    pub consent: ConsentBreakdown,
    pub retention_days: u64,
    /// 早于保留期、等待清理的事件数
    pub events_past_retention: u64,
}

#[derive(Clone)]
pub struct ReportService {
    storage: Arc<SeaOrmStorage>,
    audit: AuditService,
    retention_days: u64,
}

impl ReportService {
    pub fn new(storage: Arc<SeaOrmStorage>, retention_days: u64) -> Self {
        Self {
            audit: AuditService::new(storage.clone()),
            storage,
            retention_days,
        }
    }

    pub async fn compliance_report(&self) -> Result<ComplianceReport> {
        let now = Utc::now();
        let window_start = now - Duration::days(REPORT_WINDOW_DAYS);

        let audit_logs = self
            .audit
            .recent(Some(window_start), None, REPORT_AUDIT_LIMIT)
            .await?;

        let mut consent = ConsentBreakdown::default();
        for campaign in self.storage.list_campaigns_created_since(window_start).await? {
            if campaign.consent_verified {
                consent.verified += 1;
            } else {
                consent.not_verified += 1;
            }
        }

        let retention_cutoff = now - Duration::days(self.retention_days as i64);
        let events_past_retention = self.storage.count_events_before(retention_cutoff).await?;

        Ok(ComplianceReport {
            generated_at: now,
            window_start,
            audit_logs,
            consent,
            retention_days: self.retention_days,
            events_past_retention,
        })
    }
}
