//! Admin API 路由配置
//!
//! 将 /v1 下的路由按功能模块拆分。

use actix_web::web;

use super::analytics::get_analytics_data;
use super::auth::{change_password, login, login_rate_limiter, verify_token};
use super::campaigns::{
    complete_campaign, create_campaign, delete_campaign, get_campaign, list_campaigns,
    pause_campaign, resume_campaign, send_campaign, verify_consent,
};
use super::reports::{get_compliance_report, list_audit_logs, purge_expired_data};
use super::targets::{add_target, export_campaign, import_targets, list_targets};
use super::targets_directory::list_directory;
use super::templates::{
    create_template, delete_template, get_template, get_template_indicators, list_templates,
    send_test_email, update_template,
};

/// 认证路由 `/auth`
///
/// - POST /auth/login - 登录（带限流，免认证）
/// - GET /auth/verify - 验证 token
/// - POST /auth/password - 修改密码
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .service(
            web::resource("/login")
                .wrap(login_rate_limiter())
                .route(web::post().to(login)),
        )
        .route("/verify", web::get().to(verify_token))
        .route("/password", web::post().to(change_password))
}

/// 模板路由 `/templates`
pub fn templates_routes() -> actix_web::Scope {
    web::scope("/templates")
        .route("", web::get().to(list_templates))
        .route("", web::post().to(create_template))
        .route("/{id}/indicators", web::get().to(get_template_indicators))
        .route("/{id}/test", web::post().to(send_test_email))
        .route("/{id}", web::get().to(get_template))
        .route("/{id}", web::put().to(update_template))
        .route("/{id}", web::delete().to(delete_template))
}

/// 活动路由 `/campaigns`
///
/// 生命周期操作均为 POST /campaigns/{id}/{action}
pub fn campaigns_routes() -> actix_web::Scope {
    web::scope("/campaigns")
        .route("", web::get().to(list_campaigns))
        .route("", web::post().to(create_campaign))
        .route("/{id}/targets/import", web::post().to(import_targets))
        .route("/{id}/targets", web::get().to(list_targets))
        .route("/{id}/targets", web::post().to(add_target))
        .route("/{id}/export", web::get().to(export_campaign))
        .route("/{id}/consent", web::post().to(verify_consent))
        .route("/{id}/send", web::post().to(send_campaign))
        .route("/{id}/pause", web::post().to(pause_campaign))
        .route("/{id}/resume", web::post().to(resume_campaign))
        .route("/{id}/complete", web::post().to(complete_campaign))
        .route("/{id}", web::get().to(get_campaign))
        .route("/{id}", web::delete().to(delete_campaign))
}

/// 目标目录 `/targets`
pub fn targets_routes() -> actix_web::Scope {
    web::scope("/targets").route("", web::get().to(list_directory))
}

pub fn analytics_routes() -> actix_web::Scope {
    web::scope("/analytics").route("/data", web::get().to(get_analytics_data))
}

/// 合规与维护路由
pub fn reports_routes() -> actix_web::Scope {
    web::scope("")
        .route("/reports/compliance", web::get().to(get_compliance_report))
        .route("/audit", web::get().to(list_audit_logs))
        .route("/maintenance/purge", web::post().to(purge_expired_data))
}

/// Admin API v1 路由
pub fn admin_v1_routes() -> actix_web::Scope {
    web::scope("/v1")
        .service(auth_routes())
        .service(templates_routes())
        .service(campaigns_routes())
        .service(targets_routes())
        .service(analytics_routes())
        .service(reports_routes())
}
