//! 追踪 token 签发与解析
//!
//! token 是追踪端点唯一的凭证：32 字节 CSPRNG 随机数，URL-safe base64 无填充（43 字符）。
//! 同一 (campaign, target) 只签发一次，再次请求返回已有 token。

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sea_orm::ConnectionTrait;
use tracing::debug;

use crate::errors::{PhishsimError, Result};
use crate::storage::backend::{find_campaign_target_by_pair, insert_campaign_target};
use crate::storage::{CampaignTarget, SeaOrmStorage, TokenBinding};

pub const TOKEN_BYTES: usize = 32;

/// 生成新 token（不查重，唯一索引兜底）
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 形状校验：长度与字符集，避免无意义的数据库查询
pub fn is_well_formed(token: &str) -> bool {
    token.len() == 43
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// 在给定连接（可为事务）上为 (campaign, target) 取得或创建收件人记录
pub async fn issue_on<C: ConnectionTrait>(
    conn: &C,
    campaign_id: i64,
    target_id: i64,
    consent_given: bool,
) -> Result<(CampaignTarget, bool)> {
    if let Some(existing) = find_campaign_target_by_pair(conn, campaign_id, target_id).await? {
        return Ok((existing, false));
    }

    let token = generate_token();
    let created =
        match insert_campaign_target(conn, campaign_id, target_id, &token, consent_given).await {
            Ok(created) => created,
            // 并发签发同一组合：唯一索引冲突时返回对方写入的记录
            Err(PhishsimError::Conflict(msg)) => {
                return find_campaign_target_by_pair(conn, campaign_id, target_id)
                    .await?
                    .map(|existing| (existing, false))
                    .ok_or(PhishsimError::Conflict(msg));
            }
            Err(e) => return Err(e),
        };
    debug!(
        "Issued tracking token for campaign {} target {}",
        campaign_id, target_id
    );
    Ok((created, true))
}

#[derive(Clone)]
pub struct TokenIssuer {
    storage: Arc<SeaOrmStorage>,
}

impl TokenIssuer {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 返回该组合的 token；活动或目标不存在时 NotFound
    pub async fn issue(&self, campaign_id: i64, target_id: i64) -> Result<String> {
        let campaign = self.storage.require_campaign(campaign_id).await?;
        if self.storage.get_target(target_id).await?.is_none() {
            return Err(PhishsimError::not_found(format!(
                "Target {} not found",
                target_id
            )));
        }

        let (ct, _) = issue_on(
            self.storage.get_db(),
            campaign_id,
            target_id,
            campaign.consent_verified,
        )
        .await?;
        Ok(ct.unique_token)
    }

    pub async fn resolve(&self, token: &str) -> Result<TokenBinding> {
        if !is_well_formed(token) {
            return Err(PhishsimError::not_found("Unknown tracking token"));
        }
        self.storage
            .resolve_token(token)
            .await?
            .ok_or_else(|| PhishsimError::not_found("Unknown tracking token"))
    }
}
