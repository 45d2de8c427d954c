//! Service layer for business logic
//!
//! HTTP handlers 与 CLI 共用这里的业务逻辑。

pub mod analytics_service;
pub mod audit_service;
pub mod campaign_service;
pub mod event_recorder;
pub mod import_validation;
pub mod indicators;
pub mod mail;
pub mod report_service;
pub mod template_service;
pub mod token_issuer;
pub mod user_service;

pub use analytics_service::{ActivityRange, AnalyticsService, ActivitySummary, PlatformOverview};
pub use audit_service::{Actor, AuditAction, AuditService};
pub use campaign_service::{
    CampaignDetail, CampaignService, ImportReport, RecipientSummary, TargetSearch,
};
pub use event_recorder::{EventContext, EventRecorder};
pub use mail::{MailJob, MailQueue, MailTransport, MailWorker, OutgoingMail};
pub use report_service::{ComplianceReport, ReportService};
pub use template_service::{
    RenderSettings, RenderedEmail, TemplateService, TemplateVariables, TestRecipient, TestSendReport,
};
pub use token_issuer::TokenIssuer;
pub use user_service::UserService;
