//! Analytics API 端点
//!
//! 单一入口 `GET /analytics/data?type=...`：
//! - campaign_metrics / campaign_timeline / department_performance / time_to_engagement
//!   需要 `campaign_id`，部分支持 `department` 过滤
//! - platform_overview / activity_summary 为全局统计

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, Result as ActixResult, web};
use tracing::trace;

use crate::services::AnalyticsService;

use super::error_code::ErrorCode;
use super::helpers::{api_result, error_response};
use super::types::{AnalyticsKind, AnalyticsQuery};

fn missing_campaign_id(kind: AnalyticsKind) -> HttpResponse {
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorCode::AnalyticsInvalidParameter,
        &format!("campaign_id is required for {:?}", kind),
    )
}

pub async fn get_analytics_data(
    query: web::Query<AnalyticsQuery>,
    analytics: web::Data<AnalyticsService>,
) -> ActixResult<impl Responder> {
    let query = query.into_inner();
    trace!("Admin API: analytics query {:?}", query);

    let department = query
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let response = match (query.kind, query.campaign_id) {
        (AnalyticsKind::PlatformOverview, _) => api_result(analytics.platform_overview().await),
        (AnalyticsKind::ActivitySummary, _) => {
            api_result(analytics.activity_summary(query.range).await)
        }
        (AnalyticsKind::CampaignMetrics, Some(id)) => {
            api_result(analytics.campaign_metrics(id, department).await)
        }
        (AnalyticsKind::CampaignTimeline, Some(id)) => api_result(
            analytics
                .campaign_timeline(id, query.granularity, department)
                .await,
        ),
        (AnalyticsKind::DepartmentPerformance, Some(id)) => {
            api_result(analytics.department_performance(id).await)
        }
        (AnalyticsKind::TimeToEngagement, Some(id)) => {
            api_result(analytics.time_to_engagement(id, department).await)
        }
        (kind, None) => missing_campaign_id(kind),
    };

    Ok(response)
}
