use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::services::event_recorder::{EventContext, EventRecorder};
use crate::services::template_service::{RenderSettings, TemplateVariables, render};
use crate::storage::{CampaignStatus, EventType, SeaOrmStorage};

use super::MailJob;
use super::transport::{MailTransport, OutgoingMail};

/// 单个任务的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Bounced,
    /// 收件人不存在、活动不在 active 状态或已经发送过
    Skipped,
}

pub struct MailWorker {
    storage: Arc<SeaOrmStorage>,
    transport: Arc<dyn MailTransport>,
    recorder: EventRecorder,
    settings: RenderSettings,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl MailWorker {
    /// `max_per_hour` 为 0 时不限速
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        transport: Arc<dyn MailTransport>,
        settings: RenderSettings,
        max_per_hour: u32,
    ) -> Self {
        // 均匀分布在一小时内，不允许突发
        let limiter = NonZeroU32::new(max_per_hour)
            .and_then(|n| Quota::with_period(Duration::from_secs(3600) / n.get()))
            .map(RateLimiter::direct);

        Self {
            recorder: EventRecorder::new(storage.clone()),
            storage,
            transport,
            settings,
            limiter,
        }
    }

    pub async fn process(&self, job: MailJob) -> Result<DeliveryOutcome> {
        let Some(ct) = self.storage.get_campaign_target(job.campaign_target_id).await? else {
            warn!("Mail job for unknown recipient {}", job.campaign_target_id);
            return Ok(DeliveryOutcome::Skipped);
        };

        let campaign = match self.storage.get_campaign(ct.campaign_id).await? {
            Some(c) if c.status == CampaignStatus::Active => c,
            Some(c) => {
                debug!(
                    "Campaign {} is {}, skipping recipient {}",
                    c.id, c.status, ct.id
                );
                return Ok(DeliveryOutcome::Skipped);
            }
            None => return Ok(DeliveryOutcome::Skipped),
        };

        let already_dispatched = self
            .storage
            .events_by_campaign_target(&[ct.id])
            .await?
            .remove(&ct.id)
            .unwrap_or_default()
            .iter()
            .any(|e| matches!(e.event_type, EventType::Sent | EventType::Bounced));
        if already_dispatched {
            return Ok(DeliveryOutcome::Skipped);
        }

        let Some(target) = self.storage.get_target(ct.target_id).await? else {
            return Ok(DeliveryOutcome::Skipped);
        };
        let template = self.storage.require_template(campaign.template_id).await?;

        let vars = TemplateVariables::for_recipient(
            &self.settings,
            &campaign.name,
            &target,
            &ct.unique_token,
        );
        let rendered = render(&template, &vars);
        let mail = OutgoingMail {
            to: target.email.clone(),
            from_name: self.settings.sender_name.clone(),
            from_email: self.settings.sender_email.clone(),
            subject: rendered.subject,
            html: rendered.html,
            headers: rendered.headers,
        };

        match self.transport.send(&mail).await {
            Ok(()) => {
                let now = Utc::now();
                let context = EventContext::default().with_metadata(json!({
                    "server_time": now.to_rfc3339(),
                    "campaign_name": campaign.name,
                    "template_name": template.name,
                }));
                self.recorder
                    .record_for(ct.id, EventType::Sent, now, context)
                    .await?;
                info!("Simulation email sent to {} (campaign {})", target.email, campaign.id);
                Ok(DeliveryOutcome::Sent)
            }
            Err(e) => {
                let now = Utc::now();
                let context = EventContext::default().with_metadata(json!({
                    "error": e.message(),
                    "timestamp": now.to_rfc3339(),
                }));
                self.recorder
                    .record_for(ct.id, EventType::Bounced, now, context)
                    .await?;
                warn!(
                    "Failed to send to {} via {}: {}",
                    target.email,
                    self.transport.name(),
                    e
                );
                Ok(DeliveryOutcome::Bounced)
            }
        }
    }

    /// 消费队列直到所有发送端关闭
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<MailJob>) {
        info!(
            "Mail worker started (transport: {}, rate limited: {})",
            self.transport.name(),
            self.limiter.is_some()
        );

        while let Some(job) = receiver.recv().await {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }
            if let Err(e) = self.process(job).await {
                error!(
                    "Mail job for recipient {} failed: {}",
                    job.campaign_target_id, e
                );
            }
        }

        info!("Mail queue closed, worker exiting");
    }

    pub fn spawn(self, receiver: mpsc::UnboundedReceiver<MailJob>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }
}
