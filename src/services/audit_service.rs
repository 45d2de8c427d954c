//! 审计日志
//!
//! 写入失败只记录日志，不影响业务操作本身。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::{info, warn};

use crate::errors::Result;
use crate::storage::{AuditEntry, NewAuditEntry, SeaOrmStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CampaignCreated,
    ConsentVerified,
    TargetsImported,
    TargetAdded,
    CampaignStarted,
    CampaignPaused,
    CampaignResumed,
    CampaignCompleted,
    CampaignDeleted,
    CampaignExported,
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    TemplateTestSent,
    UserLogin,
    LoginFailed,
    PasswordChanged,
    PhishingSubmitted,
    DataPurged,
}

/// 操作者：管理员请求中的用户与来源 IP；系统任务两者皆空
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self::default()
    }
}

#[derive(Clone)]
pub struct AuditService {
    storage: Arc<SeaOrmStorage>,
}

impl AuditService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn log(
        &self,
        actor: &Actor,
        action: AuditAction,
        resource: Option<(&str, i64)>,
        details: Option<serde_json::Value>,
    ) {
        let entry = NewAuditEntry {
            user_id: actor.user_id,
            action: action.to_string(),
            resource_type: resource.map(|(kind, _)| kind.to_string()),
            resource_id: resource.map(|(_, id)| id),
            details,
            ip_address: actor.ip_address.clone(),
        };

        match self.storage.insert_audit_entry(&entry).await {
            Ok(_) => info!(
                action = %action,
                user_id = ?actor.user_id,
                resource_id = ?entry.resource_id,
                "Audit event recorded"
            ),
            Err(e) => warn!("Failed to write audit log {}: {}", action, e),
        }
    }

    pub async fn recent(
        &self,
        since: Option<DateTime<Utc>>,
        action: Option<AuditAction>,
        limit: u64,
    ) -> Result<Vec<AuditEntry>> {
        let action = action.map(|a| a.to_string());
        self.storage
            .list_audit_entries(since, action.as_deref(), limit.clamp(1, 1000))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::CampaignStarted.to_string(), "CAMPAIGN_STARTED");
        assert_eq!(AuditAction::DataPurged.as_ref(), "DATA_PURGED");
        assert_eq!(
            AuditAction::from_str("PHISHING_SUBMITTED").unwrap(),
            AuditAction::PhishingSubmitted
        );
        assert_eq!(
            serde_json::to_string(&AuditAction::LoginFailed).unwrap(),
            "\"LOGIN_FAILED\""
        );
    }
}
