//! 数据保留清理任务
//!
//! 删除超过保留期的追踪事件，以及完成时间超过保留期的活动（连同收件人和事件）。
//! 审计日志不在清理范围内。

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::Result;
use crate::storage::backend::SeaOrmStorage;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    pub events_deleted: u64,
    pub campaigns_deleted: u64,
    pub retention_days: u64,
}

pub struct RetentionTask {
    storage: Arc<SeaOrmStorage>,
    retention_days: u64,
    batch_size: u64,
}

impl RetentionTask {
    pub fn new(storage: Arc<SeaOrmStorage>, retention_days: u64) -> Self {
        Self {
            storage,
            retention_days,
            batch_size: 5000,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn run_cleanup(&self) -> Result<RetentionReport> {
        // 0 表示关闭清理
        if self.retention_days == 0 {
            return Ok(RetentionReport::default());
        }

        // 保留期超出时间可表示范围时没有可清理的数据
        let Some(cutoff) = i64::try_from(self.retention_days)
            .ok()
            .and_then(TimeDelta::try_days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
        else {
            info!(
                "Retention window of {} days reaches past the earliest timestamp, nothing to purge",
                self.retention_days
            );
            return Ok(RetentionReport {
                retention_days: self.retention_days,
                ..Default::default()
            });
        };
        let mut report = RetentionReport {
            retention_days: self.retention_days,
            ..Default::default()
        };

        report.events_deleted = self
            .storage
            .delete_events_before(cutoff, self.batch_size)
            .await?;

        for campaign_id in self.storage.completed_campaign_ids_before(cutoff).await? {
            if self.storage.delete_campaign(campaign_id).await? {
                report.campaigns_deleted += 1;
            }
        }

        if report.events_deleted > 0 || report.campaigns_deleted > 0 {
            self.storage.invalidate_token_cache();
        }

        info!(
            "Retention purge completed: {} events, {} campaigns older than {} days",
            report.events_deleted, report.campaigns_deleted, self.retention_days
        );
        Ok(report)
    }

    /// 每隔 `interval_hours` 运行一次（首次在启动 5 分钟后）
    pub fn spawn_background_task(self: Arc<Self>, interval_hours: u64) {
        let retention_days = self.retention_days;
        tokio::spawn(async move {
            let interval = StdDuration::from_secs(interval_hours.max(1) * 60 * 60);

            tokio::time::sleep(StdDuration::from_secs(300)).await;

            loop {
                if let Err(e) = self.run_cleanup().await {
                    error!("Retention purge failed: {}", e);
                }
                tokio::time::sleep(interval).await;
            }
        });

        info!(
            "Retention background task started (interval: {} hours, retention: {} days)",
            interval_hours, retention_days
        );
    }
}
