//! 合规报告、审计日志查询与数据清理

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::analytics::RetentionTask;
use crate::api::middleware::AdminContext;
use crate::services::{AuditAction, AuditService, ReportService};

use super::helpers::{actor_for, api_result, error_from_phishsim, success_response};
use super::types::AuditQuery;

const DEFAULT_AUDIT_DAYS: i64 = 30;
const DEFAULT_AUDIT_LIMIT: u64 = 100;

pub async fn get_compliance_report(
    reports: web::Data<ReportService>,
) -> ActixResult<impl Responder> {
    Ok(api_result(reports.compliance_report().await))
}

pub async fn list_audit_logs(
    query: web::Query<AuditQuery>,
    audit: web::Data<AuditService>,
) -> ActixResult<impl Responder> {
    let days = query.days.unwrap_or(DEFAULT_AUDIT_DAYS).clamp(1, 3650);
    let since = Utc::now() - Duration::days(days);
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Ok(api_result(audit.recent(Some(since), query.action, limit).await))
}

/// 立即执行一次保留期清理
pub async fn purge_expired_data(
    req: HttpRequest,
    ctx: AdminContext,
    retention: web::Data<RetentionTask>,
    audit: web::Data<AuditService>,
) -> ActixResult<impl Responder> {
    let report = match retention.run_cleanup().await {
        Ok(report) => report,
        Err(e) => return Ok(error_from_phishsim(&e)),
    };

    info!(
        "Admin API: manual purge by '{}' removed {} events, {} campaigns",
        ctx.username, report.events_deleted, report.campaigns_deleted
    );
    audit
        .log(
            &actor_for(&req, &ctx),
            AuditAction::DataPurged,
            None,
            Some(json!({
                "events_deleted": report.events_deleted,
                "campaigns_deleted": report.campaigns_deleted,
                "retention_days": report.retention_days,
            })),
        )
        .await;

    Ok(success_response(report))
}
