use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 收件人交互事件类型
///
/// 新增类型需要在聚合器中显式处理（所有 match 均为穷举）。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    AsRefStr,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Sent,
    Opened,
    Clicked,
    Submitted,
    /// 传输失败，不计入投递
    Bounced,
}

/// 活动状态
///
/// draft → active → (paused ↔ active) → completed
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    AsRefStr,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub template_id: i64,
    pub status: CampaignStatus,
    pub consent_verified: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 新建活动
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub description: Option<String>,
    pub template_id: i64,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub created_by: Option<i64>,
}

/// 新建或更新模板时的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub subject: String,
    pub html_content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub subject: String,
    pub html_content: String,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// 新目标（导入或手工添加）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTarget {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignTarget {
    pub id: i64,
    pub campaign_id: i64,
    pub target_id: i64,
    #[serde(skip_serializing)]
    pub unique_token: String,
    pub consent_given: bool,
    pub created_at: DateTime<Utc>,
}

/// token 解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBinding {
    pub campaign_target_id: i64,
    pub campaign_id: i64,
    pub target_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailEvent {
    pub id: i64,
    pub campaign_target_id: i64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// 待写入的事件
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub campaign_target_id: i64,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// 一个收件人在活动中的完整视图（目标信息 + 该收件人的全部事件，按时间排序）
#[derive(Debug, Clone)]
pub struct RecipientActivity {
    pub campaign_target: CampaignTarget,
    pub target: Target,
    pub events: Vec<EmailEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_event_type_string_forms() {
        assert_eq!(EventType::Opened.as_ref(), "opened");
        assert_eq!(EventType::from_str("submitted").unwrap(), EventType::Submitted);
        assert!(EventType::from_str("forwarded").is_err());
        assert_eq!(
            serde_json::to_string(&EventType::Clicked).unwrap(),
            "\"clicked\""
        );
    }

    #[test]
    fn test_campaign_status_string_forms() {
        assert_eq!(CampaignStatus::Completed.to_string(), "completed");
        assert_eq!(
            CampaignStatus::from_str("paused").unwrap(),
            CampaignStatus::Paused
        );
    }
}
