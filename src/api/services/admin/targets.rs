//! Admin API 收件人管理、CSV 导入与结果导出

use std::collections::VecDeque;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Responder, Result as ActixResult, web};
use bytes::Bytes;
use chrono::Utc;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::api::middleware::AdminContext;
use crate::errors::PhishsimError;
use crate::services::CampaignService;
use crate::storage::{CampaignTarget, NewTarget, Target};
use crate::utils::csv_handler::{ExportRow, write_export_rows};

use super::helpers::{actor_for, api_result, created_response, error_from_phishsim};

/// 每批次序列化的行数
const EXPORT_BATCH_SIZE: usize = 1000;

/// 最大导入文件大小 (10MB)
pub const MAX_IMPORT_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Serialize)]
struct AddedTarget {
    target: Target,
    campaign_target: CampaignTarget,
}

pub async fn list_targets(
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    Ok(api_result(campaigns.recipients(path.into_inner()).await))
}

pub async fn add_target(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    body: web::Json<NewTarget>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let actor = actor_for(&req, &ctx);
    match campaigns
        .add_target(path.into_inner(), body.into_inner(), &actor)
        .await
    {
        Ok((target, campaign_target)) => Ok(created_response(AddedTarget {
            target,
            campaign_target,
        })),
        Err(e) => Ok(error_from_phishsim(&e)),
    }
}

/// 读取 multipart 中的 `file` 字段，超过上限立即中止
async fn read_csv_field(mut payload: Multipart) -> Result<Vec<u8>, PhishsimError> {
    let mut csv_data: Option<Vec<u8>> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            PhishsimError::invalid_multipart_data(format!("Invalid multipart data: {}", e))
        })?;

        if field.name() != Some("file") {
            // 忽略未知字段
            while field.next().await.is_some() {}
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                PhishsimError::invalid_multipart_data(format!("Failed to read file: {}", e))
            })?;
            if data.len() + bytes.len() > MAX_IMPORT_FILE_SIZE {
                return Err(PhishsimError::file_too_large(format!(
                    "File size exceeds maximum {} MB",
                    MAX_IMPORT_FILE_SIZE / 1024 / 1024
                )));
            }
            data.extend_from_slice(&bytes);
        }
        csv_data = Some(data);
    }

    match csv_data {
        Some(data) if !data.is_empty() => Ok(data),
        _ => Err(PhishsimError::csv_file_missing("No CSV file provided")),
    }
}

/// 从 CSV 导入收件人；逐行错误在 `rejected_rows` 中返回
pub async fn import_targets(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    payload: Multipart,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    info!("Admin API: import targets into campaign {}", campaign_id);

    let data = match read_csv_field(payload).await {
        Ok(data) => data,
        Err(e) => return Ok(error_from_phishsim(&e)),
    };
    debug!("Admin API: import file size={} bytes", data.len());

    let actor = actor_for(&req, &ctx);
    Ok(api_result(
        campaigns.import_targets(campaign_id, &data, &actor).await,
    ))
}

/// 分批在 blocking 线程池序列化，第一批带表头；没有收件人时只输出表头
fn export_stream(rows: Vec<ExportRow>) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    let mut batches = VecDeque::new();
    let mut iter = rows.into_iter();
    loop {
        let batch: Vec<ExportRow> = iter.by_ref().take(EXPORT_BATCH_SIZE).collect();
        if batch.is_empty() {
            break;
        }
        batches.push_back(batch);
    }
    if batches.is_empty() {
        batches.push_back(Vec::new());
    }

    stream::unfold((batches, true), |(mut batches, first)| async move {
        let batch = batches.pop_front()?;
        let batch_len = batch.len();

        let chunk = match tokio::task::spawn_blocking(move || write_export_rows(&batch, first))
            .await
        {
            Ok(Ok(bytes)) => {
                debug!("Export stream: sent batch of {} rows", batch_len);
                Ok(Bytes::from(bytes))
            }
            Ok(Err(e)) => {
                error!("Failed to serialize export rows: {}", e);
                Err(actix_web::error::ErrorInternalServerError(
                    "CSV generation error",
                ))
            }
            Err(e) => {
                error!("Blocking task panicked: {}", e);
                Err(actix_web::error::ErrorInternalServerError("CSV task failed"))
            }
        };

        Some((chunk, (batches, false)))
    })
}

/// 导出活动结果为 CSV（流式响应）
pub async fn export_campaign(
    req: HttpRequest,
    ctx: AdminContext,
    path: web::Path<i64>,
    campaigns: web::Data<CampaignService>,
) -> ActixResult<impl Responder> {
    let campaign_id = path.into_inner();
    let actor = actor_for(&req, &ctx);

    let rows = match campaigns.export_rows(campaign_id, &actor).await {
        Ok(rows) => rows,
        Err(e) => return Ok(error_from_phishsim(&e)),
    };

    let filename = format!(
        "campaign_{}_results_{}.csv",
        campaign_id,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    info!(
        "Admin API: exporting {} rows to {}",
        rows.len(),
        filename
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .streaming(export_stream(rows)))
}
