//! Admin API 活动管理与生命周期

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::{info, trace};

use crate::api::middleware::AdminContext;
use crate::errors::Result;
use crate::services::{Actor, CampaignService};
use crate::storage::{Campaign, NewCampaign};

use super::helpers::{actor_for, api_result, created_response, error_from_phishsim};
use super::types::{ListCampaignsQuery, MessageResponse};

pub async fn list_campaigns(
    query: web::Query<ListCampaignsQuery>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    trace!("Admin API: list campaigns, status filter: {:?}", query.status);
    Ok(api_result(campaigns.list(query.status).await))
}

/// 活动详情（含模板名与汇总指标）
pub async fn get_campaign(
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    Ok(api_result(campaigns.detail(path.into_inner()).await))
}

pub async fn create_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    body: web::Json<NewCampaign>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let actor = actor_for(&req, &ctx);
    match campaigns.create(body.into_inner(), &actor).await {
        Ok(campaign) => {
            info!(
                "Admin API: campaign created: {} ({})",
                campaign.id, campaign.name
            );
            Ok(created_response(campaign))
        }
        Err(e) => Ok(error_from_phishsim(&e)),
    }
}

pub async fn delete_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let actor = actor_for(&req, &ctx);
    Ok(api_result(campaigns.delete(id, &actor).await.map(|_| {
        MessageResponse {
            message: format!("Campaign {} deleted", id),
        }
    })))
}

#[derive(Clone, Copy, Debug)]
enum Lifecycle {
    Consent,
    Send,
    Pause,
    Resume,
    Complete,
}

async fn apply(
    campaigns: &CampaignService,
    op: Lifecycle,
    id: i64,
    actor: &Actor,
) -> Result<Campaign> {
    match op {
        Lifecycle::Consent => campaigns.verify_consent(id, actor).await,
        Lifecycle::Send => campaigns.send(id, actor).await,
        Lifecycle::Pause => campaigns.pause(id, actor).await,
        Lifecycle::Resume => campaigns.resume(id, actor).await,
        Lifecycle::Complete => campaigns.complete(id, actor).await,
    }
}

async fn lifecycle(
    op: Lifecycle,
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    let actor = actor_for(&req, &ctx);
    let result = apply(&campaigns, op, id, &actor).await;
    if let Ok(campaign) = &result {
        info!(
            "Admin API: campaign {} {:?} by '{}', now {}",
            id, op, ctx.username, campaign.status
        );
    }
    Ok(api_result(result))
}

pub async fn verify_consent(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    lifecycle(Lifecycle::Consent, req, ctx, path, campaigns).await
}

pub async fn send_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    lifecycle(Lifecycle::Send, req, ctx, path, campaigns).await
}

pub async fn pause_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    lifecycle(Lifecycle::Pause, req, ctx, path, campaigns).await
}

pub async fn resume_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    lifecycle(Lifecycle::Resume, req, ctx, path, campaigns).await
}

pub async fn complete_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    lifecycle(Lifecycle::Complete, req, ctx, path, campaigns).await
}
