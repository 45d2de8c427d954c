use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analytics::RetentionTask;
use crate::config::{StaticConfig, get_config};
use crate::services::mail::{MailTransport, build_transport};
use crate::services::{
    AnalyticsService, AuditService, CampaignService, EventRecorder, MailQueue, MailWorker,
    RenderSettings, ReportService, TemplateService, TokenIssuer, UserService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};

/// JWT 密钥最短长度（字节）
const MIN_JWT_SECRET_LEN: usize = 32;

/// HTTP 层共享的服务集合
///
/// 每个服务内部持有 `Arc`，克隆开销很小。
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub campaigns: CampaignService,
    pub templates: TemplateService,
    pub analytics: AnalyticsService,
    pub reports: ReportService,
    pub users: UserService,
    pub audit: AuditService,
    pub issuer: TokenIssuer,
    pub recorder: EventRecorder,
    pub retention: Arc<RetentionTask>,
}

impl AppServices {
    /// `mail_queue` 为 None 时活动启动不会发信（CLI 与测试使用）
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        config: &StaticConfig,
        mail_queue: Option<MailQueue>,
    ) -> Self {
        let mut campaigns = CampaignService::new(storage.clone(), config.campaign.consent_required);
        if let Some(queue) = mail_queue {
            campaigns = campaigns.with_mail_queue(queue);
        }

        Self {
            campaigns,
            templates: TemplateService::new(storage.clone()),
            analytics: AnalyticsService::new(storage.clone()),
            reports: ReportService::new(storage.clone(), config.campaign.retention_days),
            users: UserService::new(storage.clone()),
            audit: AuditService::new(storage.clone()),
            issuer: TokenIssuer::new(storage.clone()),
            recorder: EventRecorder::new(storage.clone()),
            retention: Arc::new(RetentionTask::new(
                storage.clone(),
                config.campaign.retention_days,
            )),
            storage,
        }
    }

    /// 模板测试发送使用的发信通道
    pub fn with_mailer(
        mut self,
        transport: Arc<dyn MailTransport>,
        settings: RenderSettings,
    ) -> Self {
        self.templates = self.templates.with_mailer(transport, settings);
        self
    }

    /// 注册为 actix `app_data`，供 `App::configure` 使用
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.storage.clone()))
            .app_data(web::Data::new(self.campaigns.clone()))
            .app_data(web::Data::new(self.templates.clone()))
            .app_data(web::Data::new(self.analytics.clone()))
            .app_data(web::Data::new(self.reports.clone()))
            .app_data(web::Data::new(self.users.clone()))
            .app_data(web::Data::new(self.audit.clone()))
            .app_data(web::Data::new(self.issuer.clone()))
            .app_data(web::Data::new(self.recorder.clone()))
            .app_data(web::Data::from(self.retention.clone()));
    }
}

pub struct StartupContext {
    pub services: AppServices,
    pub admin_prefix: String,
}

/// 数据库与 SMTP 的 TLS 都走 rustls，需要先选定进程级 provider
pub fn install_crypto_provider() -> Result<()> {
    if rustls::crypto::CryptoProvider::get_default().is_some() {
        return Ok(());
    }
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))
}

/// 准备服务器启动的上下文
///
/// 包括存储、发信 worker、保留期清理任务与服务集合。
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    install_crypto_provider()?;

    let config = get_config();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    check_component_enabled(&config);

    // 发信队列与 worker
    let transport: Arc<dyn MailTransport> =
        Arc::from(build_transport(&config.mail).context("Failed to build mail transport")?);
    let (queue, receiver) = MailQueue::channel();
    MailWorker::new(
        storage.clone(),
        transport.clone(),
        RenderSettings::from_config(&config),
        config.campaign.max_emails_per_hour,
    )
    .spawn(receiver);

    let services = AppServices::new(storage, &config, Some(queue))
        .with_mailer(transport, RenderSettings::from_config(&config));

    // 进程重启后补发 active 活动中尚未发送的邮件
    match services.campaigns.requeue_active().await {
        Ok(0) => {}
        Ok(n) => info!("Re-queued {} pending emails from active campaigns", n),
        Err(e) => warn!("Failed to re-queue pending emails: {}", e),
    }

    if config.campaign.retention_days > 0 {
        services
            .retention
            .clone()
            .spawn_background_task(config.campaign.retention_interval_hours);
    } else {
        info!("Data retention purge disabled (retention_days = 0)");
    }

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        services,
        admin_prefix: config.api.admin_prefix.clone(),
    })
}

fn check_component_enabled(config: &StaticConfig) {
    let secret_len = config.api.jwt_secret.len();
    if secret_len == 0 {
        warn!(
            "api.jwt_secret is empty, a random secret will be used and tokens \
             will not survive a restart"
        );
    } else if secret_len < MIN_JWT_SECRET_LEN {
        warn!(
            "api.jwt_secret is only {} bytes, at least {} is recommended",
            secret_len, MIN_JWT_SECRET_LEN
        );
    }

    // 追踪链接与像素地址都拼在 base_url 后面
    match url::Url::parse(&config.campaign.base_url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => {
            info!("Tracking links will point at {}", u);
        }
        Ok(u) => warn!(
            "campaign.base_url uses scheme '{}', recipients' mail clients may not follow it",
            u.scheme()
        ),
        Err(e) => warn!(
            "campaign.base_url '{}' is not a valid URL ({}), tracking links will be broken",
            config.campaign.base_url, e
        ),
    }

    if config.campaign.consent_required {
        info!("Consent verification required before campaigns can be sent");
    } else {
        warn!("Consent verification is disabled (campaign.consent_required = false)");
    }

    info!("Admin API available at: {}", config.api.admin_prefix);
}
