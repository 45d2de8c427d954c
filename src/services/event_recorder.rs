//! 事件记录
//!
//! 每次调用追加一行 email_events，不修改其他任何记录。
//! 去重只发生在统计阶段。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::Result;
use crate::storage::{EmailEvent, EventType, NewEvent, SeaOrmStorage};

use super::token_issuer::TokenIssuer;

const MAX_USER_AGENT_LEN: usize = 512;

/// 请求上下文（客户端 IP、User-Agent、附加信息）
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl EventContext {
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

fn truncate_user_agent(ua: Option<String>) -> Option<String> {
    ua.map(|mut ua| {
        if ua.len() > MAX_USER_AGENT_LEN {
            let mut cut = MAX_USER_AGENT_LEN;
            while !ua.is_char_boundary(cut) {
                cut -= 1;
            }
            ua.truncate(cut);
        }
        ua
    })
}

#[derive(Clone)]
pub struct EventRecorder {
    storage: Arc<SeaOrmStorage>,
    issuer: TokenIssuer,
}

impl EventRecorder {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            issuer: TokenIssuer::new(storage.clone()),
            storage,
        }
    }

    /// 通过 token 记录事件，未知 token 返回 NotFound
    pub async fn record(
        &self,
        token: &str,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        context: EventContext,
    ) -> Result<EmailEvent> {
        let binding = self.issuer.resolve(token).await?;
        self.record_for(binding.campaign_target_id, event_type, timestamp, context)
            .await
    }

    /// 直接按收件人 id 记录（发信 worker 使用）
    pub async fn record_for(
        &self,
        campaign_target_id: i64,
        event_type: EventType,
        timestamp: DateTime<Utc>,
        context: EventContext,
    ) -> Result<EmailEvent> {
        let event = NewEvent {
            campaign_target_id,
            event_type,
            timestamp,
            ip_address: context.ip_address,
            user_agent: truncate_user_agent(context.user_agent),
            metadata: context.metadata,
        };

        let stored = self.storage.insert_event(&event).await?;
        debug!(
            "Recorded {} event {} for recipient {}",
            event_type, stored.id, campaign_target_id
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_truncated_on_char_boundary() {
        let ua = "é".repeat(400);
        let truncated = truncate_user_agent(Some(ua)).unwrap();
        assert!(truncated.len() <= MAX_USER_AGENT_LEN);
        assert!(truncated.chars().all(|c| c == 'é'));

        assert_eq!(truncate_user_agent(None), None);
        assert_eq!(
            truncate_user_agent(Some("curl/8.0".into())).as_deref(),
            Some("curl/8.0")
        );
    }
}
