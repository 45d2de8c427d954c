//! 全局目标目录

use actix_web::{Responder, Result as ActixResult, web};
use tracing::trace;

use crate::services::{CampaignService, TargetSearch};

use super::helpers::api_result;

/// `GET /targets?search=&include_inactive=&page=`
pub async fn list_directory(
    query: web::Query<TargetSearch>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    trace!("Admin API: target directory {:?}", query);
    Ok(api_result(campaigns.target_directory(&query).await))
}
