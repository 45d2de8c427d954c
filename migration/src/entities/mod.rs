pub mod audit_log;
pub mod campaign;
pub mod campaign_target;
pub mod email_event;
pub mod target;
pub mod template;
pub mod user;

pub use audit_log::Entity as AuditLogEntity;
pub use campaign::Entity as CampaignEntity;
pub use campaign_target::Entity as CampaignTargetEntity;
pub use email_event::Entity as EmailEventEntity;
pub use target::Entity as TargetEntity;
pub use template::Entity as TemplateEntity;
pub use user::Entity as UserEntity;
