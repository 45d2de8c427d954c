//! Admin API 类型定义

use serde::{Deserialize, Serialize};

use crate::analytics::Granularity;
use crate::services::{ActivityRange, AuditAction};
use crate::storage::{CampaignStatus, User};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct AuthSuccessResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: User,
}

#[derive(Serialize, Clone, Debug)]
pub struct VerifyResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ListCampaignsQuery {
    pub status: Option<CampaignStatus>,
}

/// 分析查询参数
#[derive(Deserialize, Clone, Debug)]
pub struct AnalyticsQuery {
    #[serde(rename = "type")]
    pub kind: AnalyticsKind,
    pub campaign_id: Option<i64>,
    pub department: Option<String>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub range: ActivityRange,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    CampaignMetrics,
    CampaignTimeline,
    DepartmentPerformance,
    TimeToEngagement,
    PlatformOverview,
    ActivitySummary,
}

/// 审计查询：最近 `days` 天（默认 30），可按动作过滤
#[derive(Deserialize, Clone, Debug, Default)]
pub struct AuditQuery {
    pub days: Option<i64>,
    pub action: Option<AuditAction>,
    pub limit: Option<u64>,
}

