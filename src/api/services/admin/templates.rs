//! Admin API 邮件模板 CRUD

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::api::middleware::AdminContext;
use crate::services::{TemplateService, TestRecipient};
use crate::storage::TemplateDraft;

use super::helpers::{actor_for, api_result, created_response, error_from_phishsim};
use super::types::MessageResponse;

pub async fn list_templates(templates: web::Data<TemplateService>) -> ActixResult<impl Responder> {
    trace!("Admin API: list templates");
    Ok(api_result(templates.list().await))
}

pub async fn get_template(
    path: web::Path<i64>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    Ok(api_result(templates.get(path.into_inner()).await))
}

pub async fn create_template(
    req: HttpRequest,
    ctx: AdminContext,
    body: web::Json<TemplateDraft>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    let actor = actor_for(&req, &ctx);
    match templates.create(body.into_inner(), &actor).await {
        Ok(template) => {
            info!("Admin API: template created: {}", template.id);
            Ok(created_response(template))
        }
        Err(e) => Ok(error_from_phishsim(&e)),
    }
}

pub async fn update_template(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    body: web::Json<TemplateDraft>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    let actor = actor_for(&req, &ctx);
    Ok(api_result(
        templates
            .update(path.into_inner(), body.into_inner(), &actor)
            .await,
    ))
}

pub async fn delete_template(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let actor = actor_for(&req, &ctx);
    Ok(api_result(templates.delete(id, &actor).await.map(|_| {
        MessageResponse {
            message: format!("Template {} deleted", id),
        }
    })))
}

/// 模板中的钓鱼特征，用于培训说明
pub async fn get_template_indicators(
    path: web::Path<i64>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    Ok(api_result(templates.indicators(path.into_inner()).await))
}

/// 向指定地址发送一封预览邮件，不产生活动数据
pub async fn send_test_email(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    body: web::Json<TestRecipient>,
    templates: web::Data<TemplateService>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let actor = actor_for(&req, &ctx);
    info!("Admin API: test send of template {}", id);
    Ok(api_result(
        templates.send_test(id, body.into_inner(), &actor).await,
    ))
}
