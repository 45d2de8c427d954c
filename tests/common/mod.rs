//! 集成测试共用的初始化与数据构造
#![allow(dead_code)]

use std::sync::{Arc, Once};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use phishsim::config::{get_config, init_config};
use phishsim::runtime::lifetime::startup::AppServices;
use phishsim::services::{Actor, EventContext, EventRecorder};
use phishsim::storage::{
    Campaign, EmailTemplate, EventType, NewCampaign, NewTarget, SeaOrmStorage, TemplateDraft,
};

static INIT: Once = Once::new();

pub fn init_static_config() {
    INIT.call_once(|| {
        init_config();
    });
}

/// 每个测试一个独立的 SQLite 文件；返回的 TempDir 需要存活到测试结束
pub async fn new_storage() -> (TempDir, Arc<SeaOrmStorage>) {
    init_static_config();
    let temp_dir = TempDir::new().expect("创建临时目录失败");
    let db_path = temp_dir.path().join("phishsim_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("创建存储失败");
    (temp_dir, Arc::new(storage))
}

/// 不带发信队列的服务集合
pub fn services(storage: &Arc<SeaOrmStorage>) -> AppServices {
    AppServices::new(storage.clone(), &get_config(), None)
}

pub fn admin() -> Actor {
    Actor {
        user_id: None,
        ip_address: Some("10.0.0.1".to_string()),
    }
}

pub fn draft(name: &str) -> TemplateDraft {
    TemplateDraft {
        name: name.to_string(),
        description: Some("Quarterly drill".to_string()),
        subject: "Action required: {{first_name}}, verify your account".to_string(),
        html_content: "<p>Hi {{first_name}},</p><p><a href=\"{{click_url}}\">Verify now</a></p>{{tracking_pixel}}".to_string(),
        is_active: true,
    }
}

pub async fn seed_template(storage: &Arc<SeaOrmStorage>) -> EmailTemplate {
    storage
        .create_template(&draft("Password expiry"), None)
        .await
        .expect("创建模板失败")
}

pub async fn seed_campaign(storage: &Arc<SeaOrmStorage>, name: &str) -> Campaign {
    let template = seed_template(storage).await;
    storage
        .create_campaign(&NewCampaign {
            name: name.to_string(),
            description: None,
            template_id: template.id,
            scheduled_at: None,
            created_by: None,
        })
        .await
        .expect("创建活动失败")
}

pub fn target(email: &str, department: Option<&str>) -> NewTarget {
    NewTarget {
        email: email.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        department: department.map(str::to_string),
    }
}

/// 添加目标并返回 (campaign_target_id, token)
pub async fn enroll(
    storage: &Arc<SeaOrmStorage>,
    campaign_id: i64,
    email: &str,
    department: Option<&str>,
) -> (i64, String) {
    let svc = services(storage);
    let (_, ct) = svc
        .campaigns
        .add_target(campaign_id, target(email, department), &admin())
        .await
        .expect("添加目标失败");
    (ct.id, ct.unique_token)
}

pub async fn record_at(
    storage: &Arc<SeaOrmStorage>,
    campaign_target_id: i64,
    event_type: EventType,
    at: DateTime<Utc>,
) {
    EventRecorder::new(storage.clone())
        .record_for(campaign_target_id, event_type, at, EventContext::default())
        .await
        .expect("记录事件失败");
}
