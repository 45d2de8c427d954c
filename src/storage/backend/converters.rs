//! Sea-ORM Model → 领域类型转换

use std::str::FromStr;

use tracing::warn;

use crate::errors::{PhishsimError, Result};
use crate::storage::models::{
    AuditEntry, Campaign, CampaignStatus, CampaignTarget, EmailEvent, EmailTemplate, EventType,
    Target, User,
};
use migration::entities::{
    audit_log, campaign, campaign_target, email_event, target, template, user,
};

pub fn model_to_campaign(model: campaign::Model) -> Result<Campaign> {
    let status = CampaignStatus::from_str(&model.status).map_err(|_| {
        PhishsimError::database_operation(format!(
            "campaign {} has unknown status '{}'",
            model.id, model.status
        ))
    })?;

    Ok(Campaign {
        id: model.id,
        name: model.name,
        description: model.description,
        template_id: model.template_id,
        status,
        consent_verified: model.consent_verified,
        created_by: model.created_by,
        created_at: model.created_at,
        scheduled_at: model.scheduled_at,
        started_at: model.started_at,
        completed_at: model.completed_at,
    })
}

pub fn model_to_template(model: template::Model) -> EmailTemplate {
    EmailTemplate {
        id: model.id,
        name: model.name,
        description: model.description,
        subject: model.subject,
        html_content: model.html_content,
        is_active: model.is_active,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_target(model: target::Model) -> Target {
    Target {
        id: model.id,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
        department: model.department,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub fn model_to_campaign_target(model: campaign_target::Model) -> CampaignTarget {
    CampaignTarget {
        id: model.id,
        campaign_id: model.campaign_id,
        target_id: model.target_id,
        unique_token: model.unique_token,
        consent_given: model.consent_given,
        created_at: model.created_at,
    }
}

/// 未知事件类型返回 None（只会出现在手工改库的情况下）
pub fn model_to_event(model: email_event::Model) -> Option<EmailEvent> {
    let event_type = match EventType::from_str(&model.event_type) {
        Ok(t) => t,
        Err(_) => {
            warn!(
                "Skipping email_event {} with unknown type '{}'",
                model.id, model.event_type
            );
            return None;
        }
    };

    Some(EmailEvent {
        id: model.id,
        campaign_target_id: model.campaign_target_id,
        event_type,
        timestamp: model.timestamp,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        metadata: model
            .metadata
            .and_then(|raw| serde_json::from_str(&raw).ok()),
    })
}

pub fn model_to_audit_entry(model: audit_log::Model) -> AuditEntry {
    AuditEntry {
        id: model.id,
        user_id: model.user_id,
        action: model.action,
        resource_type: model.resource_type,
        resource_id: model.resource_id,
        details: model.details.and_then(|raw| serde_json::from_str(&raw).ok()),
        ip_address: model.ip_address,
        timestamp: model.timestamp,
    }
}

pub fn model_to_user(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        is_admin: model.is_admin,
        is_active: model.is_active,
        created_at: model.created_at,
        last_login: model.last_login,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn campaign_model(status: &str) -> campaign::Model {
        campaign::Model {
            id: 1,
            name: "Q3 drill".to_string(),
            description: None,
            template_id: 2,
            status: status.to_string(),
            consent_verified: true,
            created_by: Some(1),
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_campaign_status_parsed() {
        let campaign = model_to_campaign(campaign_model("paused")).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Paused);
    }

    #[test]
    fn test_unknown_campaign_status_is_error() {
        assert!(model_to_campaign(campaign_model("archived")).is_err());
    }

    #[test]
    fn test_event_metadata_parsed() {
        let model = email_event::Model {
            id: 3,
            campaign_target_id: 9,
            event_type: "bounced".to_string(),
            timestamp: Utc::now(),
            ip_address: None,
            user_agent: None,
            metadata: Some(r#"{"error":"mailbox full"}"#.to_string()),
        };
        let event = model_to_event(model).unwrap();
        assert_eq!(event.event_type, EventType::Bounced);
        assert_eq!(event.metadata.unwrap()["error"], "mailbox full");
    }

    #[test]
    fn test_unknown_event_type_skipped() {
        let model = email_event::Model {
            id: 4,
            campaign_target_id: 9,
            event_type: "forwarded".to_string(),
            timestamp: Utc::now(),
            ip_address: None,
            user_agent: None,
            metadata: None,
        };
        assert!(model_to_event(model).is_none());
    }
}
