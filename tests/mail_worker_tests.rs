//! 发信 worker 集成测试（使用记录型传输层，不连接 SMTP）

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use phishsim::errors::{PhishsimError, Result};
use phishsim::services::mail::DeliveryOutcome;
use phishsim::services::template_service::SIMULATION_HEADER;
use phishsim::services::{
    AuditAction, CampaignService, MailJob, MailQueue, MailTransport, MailWorker, OutgoingMail,
    RenderSettings, TestRecipient,
};
use phishsim::storage::{EventType, SeaOrmStorage};

use common::{admin, enroll, new_storage, seed_campaign, seed_template, services};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct RejectingTransport;

#[async_trait]
impl MailTransport for RejectingTransport {
    async fn send(&self, _mail: &OutgoingMail) -> Result<()> {
        Err(PhishsimError::mail_transport("550 mailbox unavailable"))
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

fn settings() -> RenderSettings {
    RenderSettings {
        base_url: "https://drill.example.com".to_string(),
        company_name: "Example Corp".to_string(),
        sender_name: "IT Service Desk".to_string(),
        sender_email: "it@example.com".to_string(),
    }
}

async fn events_of(storage: &Arc<SeaOrmStorage>, ct: i64) -> Vec<EventType> {
    storage
        .events_by_campaign_target(&[ct])
        .await
        .unwrap()
        .remove(&ct)
        .unwrap_or_default()
        .into_iter()
        .map(|e| e.event_type)
        .collect()
}

/// 创建一个已启动（active）的单收件人活动
async fn active_campaign(storage: &Arc<SeaOrmStorage>) -> (i64, i64, String) {
    let campaign = seed_campaign(storage, "Mail drill").await;
    let (ct, token) = enroll(storage, campaign.id, "alice@corp.com", Some("Finance")).await;
    let svc = services(storage);
    svc.campaigns.verify_consent(campaign.id, &admin()).await.unwrap();
    svc.campaigns.send(campaign.id, &admin()).await.unwrap();
    (campaign.id, ct, token)
}

#[tokio::test]
async fn test_worker_renders_sends_and_records_sent() {
    let (_dir, storage) = new_storage().await;
    let (_, ct, token) = active_campaign(&storage).await;

    let transport = Arc::new(RecordingTransport::default());
    let worker = MailWorker::new(storage.clone(), transport.clone(), settings(), 0);

    let outcome = worker.process(MailJob { campaign_target_id: ct }).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Sent);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let mail = &sent[0];
    assert_eq!(mail.to, "alice@corp.com");
    assert_eq!(mail.subject, "Action required: Test, verify your account");
    assert!(mail
        .html
        .contains(&format!("https://drill.example.com/track/click/{}", token)));
    assert!(mail
        .html
        .contains(&format!("https://drill.example.com/track/open/{}", token)));
    assert!(mail.html.contains("SECURITY TRAINING TEST"));
    assert!(mail
        .headers
        .iter()
        .any(|(name, value)| name == SIMULATION_HEADER && value == "true"));

    assert_eq!(events_of(&storage, ct).await, vec![EventType::Sent]);

    // 已发送过的收件人不再重复发送
    let again = worker.process(MailJob { campaign_target_id: ct }).await.unwrap();
    assert_eq!(again, DeliveryOutcome::Skipped);
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_records_bounce() {
    let (_dir, storage) = new_storage().await;
    let (campaign_id, ct, _) = active_campaign(&storage).await;

    let worker = MailWorker::new(storage.clone(), Arc::new(RejectingTransport), settings(), 0);
    let outcome = worker.process(MailJob { campaign_target_id: ct }).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Bounced);

    let events = storage
        .events_by_campaign_target(&[ct])
        .await
        .unwrap()
        .remove(&ct)
        .unwrap_or_default();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Bounced);
    let error = events[0]
        .metadata
        .as_ref()
        .and_then(|m| m.get("error"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert!(error.contains("550"));

    let metrics = services(&storage)
        .analytics
        .campaign_metrics(campaign_id, None)
        .await
        .unwrap();
    assert_eq!(metrics.delivered, 0);
    assert_eq!(metrics.bounced, 1);
}

#[tokio::test]
async fn test_paused_campaign_is_skipped() {
    let (_dir, storage) = new_storage().await;
    let (campaign_id, ct, _) = active_campaign(&storage).await;
    services(&storage)
        .campaigns
        .pause(campaign_id, &admin())
        .await
        .unwrap();

    let transport = Arc::new(RecordingTransport::default());
    let worker = MailWorker::new(storage.clone(), transport.clone(), settings(), 0);
    let outcome = worker.process(MailJob { campaign_target_id: ct }).await.unwrap();

    assert_eq!(outcome, DeliveryOutcome::Skipped);
    assert!(transport.sent().is_empty());
    assert!(events_of(&storage, ct).await.is_empty());
}

#[tokio::test]
async fn test_unknown_recipient_is_skipped() {
    let (_dir, storage) = new_storage().await;
    let worker = MailWorker::new(
        storage.clone(),
        Arc::new(RecordingTransport::default()),
        settings(),
        0,
    );
    let outcome = worker
        .process(MailJob { campaign_target_id: 4242 })
        .await
        .unwrap();
    assert_eq!(outcome, DeliveryOutcome::Skipped);
}

#[tokio::test]
async fn test_send_enqueues_and_worker_drains_queue() {
    let (_dir, storage) = new_storage().await;
    let campaign = seed_campaign(&storage, "Queued drill").await;
    let (a, _) = enroll(&storage, campaign.id, "a@corp.com", None).await;
    let (b, _) = enroll(&storage, campaign.id, "b@corp.com", None).await;

    let (queue, receiver) = MailQueue::channel();
    let campaigns = CampaignService::new(storage.clone(), true).with_mail_queue(queue);
    campaigns.verify_consent(campaign.id, &admin()).await.unwrap();
    campaigns.send(campaign.id, &admin()).await.unwrap();
    // 关闭发送端，worker 处理完队列后退出
    drop(campaigns);

    let transport = Arc::new(RecordingTransport::default());
    MailWorker::new(storage.clone(), transport.clone(), settings(), 0)
        .run(receiver)
        .await;

    let mut recipients: Vec<String> = transport.sent().into_iter().map(|m| m.to).collect();
    recipients.sort();
    assert_eq!(recipients, vec!["a@corp.com", "b@corp.com"]);
    assert_eq!(events_of(&storage, a).await, vec![EventType::Sent]);
    assert_eq!(events_of(&storage, b).await, vec![EventType::Sent]);

    let metrics = services(&storage)
        .analytics
        .campaign_metrics(campaign.id, None)
        .await
        .unwrap();
    assert_eq!(metrics.delivered, 2);
    assert_eq!(metrics.delivery_rate, 100.0);
}

// =============================================================================
// 模板测试发送
// =============================================================================

fn recipient(email: &str) -> TestRecipient {
    TestRecipient {
        email: email.to_string(),
        first_name: None,
        last_name: None,
        department: None,
    }
}

#[tokio::test]
async fn test_template_test_send_leaves_no_campaign_data() {
    let (_dir, storage) = new_storage().await;
    let template = seed_template(&storage).await;
    let transport = Arc::new(RecordingTransport::default());
    let svc = services(&storage).with_mailer(transport.clone(), settings());

    let report = svc
        .templates
        .send_test(template.id, recipient("  SecOps@Corp.com "), &admin())
        .await
        .unwrap();
    assert_eq!(report.recipient, "secops@corp.com");
    assert_eq!(report.transport, "recording");
    assert_eq!(report.subject, "Action required: Test, verify your account");

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "secops@corp.com");
    assert!(sent[0].html.contains("https://drill.example.com/"));
    assert!(sent[0].headers.iter().any(|(k, _)| k == SIMULATION_HEADER));

    // 不产生活动、目标或事件
    assert!(storage.list_campaigns(None).await.unwrap().is_empty());
    assert!(
        storage
            .search_targets(None, false, 50, 0)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(storage.count_events_by_type(None).await.unwrap().total(), 0);

    let audit = svc
        .audit
        .recent(None, Some(AuditAction::TemplateTestSent), 10)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].resource_id, Some(template.id));
}

#[tokio::test]
async fn test_template_test_send_errors() {
    let (_dir, storage) = new_storage().await;
    let template = seed_template(&storage).await;

    // 未配置发信通道
    assert!(matches!(
        services(&storage)
            .templates
            .send_test(template.id, recipient("a@corp.com"), &admin())
            .await,
        Err(PhishsimError::MailTransport(_))
    ));

    let transport = Arc::new(RecordingTransport::default());
    let svc = services(&storage).with_mailer(transport.clone(), settings());
    assert!(matches!(
        svc.templates
            .send_test(template.id, recipient("not-an-email"), &admin())
            .await,
        Err(PhishsimError::Validation(_))
    ));
    assert!(matches!(
        svc.templates
            .send_test(9999, recipient("a@corp.com"), &admin())
            .await,
        Err(PhishsimError::NotFound(_))
    ));
    assert!(transport.sent().is_empty());

    // 传输层拒收时不写审计
    let rejecting = services(&storage).with_mailer(Arc::new(RejectingTransport), settings());
    assert!(matches!(
        rejecting
            .templates
            .send_test(template.id, recipient("a@corp.com"), &admin())
            .await,
        Err(PhishsimError::MailTransport(_))
    ));
    assert!(
        rejecting
            .audit
            .recent(None, Some(AuditAction::TemplateTestSent), 10)
            .await
            .unwrap()
            .is_empty()
    );
}
