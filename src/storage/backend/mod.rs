//! SeaORM storage backend
//!
//! SQLite（默认）、MySQL/MariaDB 与 PostgreSQL。
//! 读写操作按实体拆分到子模块；需要在事务里组合的写操作以
//! `ConnectionTrait` 泛型自由函数的形式导出。

mod audit;
mod campaign_targets;
mod campaigns;
mod connection;
pub mod converters;
mod events;
pub mod retry;
mod targets;
mod templates;
mod users;

use std::time::Duration;

use moka::sync::Cache;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::errors::{PhishsimError, Result};
use crate::storage::models::TokenBinding;

pub use audit::NewAuditEntry;
pub use campaign_targets::{
    UNASSIGNED_DEPARTMENT, find_campaign_target_by_pair, insert_campaign_target,
};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use events::EventCounts;
pub use targets::find_or_create_target;

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(PhishsimError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// token → (campaign_target, campaign, target)，删除/清理活动时整体失效
    token_cache: Cache<String, TokenBinding>,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(PhishsimError::database_config("DATABASE_URL 未设置"));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig {
            max_retries: config.database.retry_count,
            base_delay_ms: config.database.retry_base_delay_ms,
            max_delay_ms: config.database.retry_max_delay_ms,
        };

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        run_migrations(&db).await?;

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            token_cache: Cache::builder()
                .time_to_live(Duration::from_secs(600))
                .max_capacity(10_000)
                .build(),
            retry_config,
        };

        info!(
            "{} storage initialized",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 清空 token 解析缓存（活动被删除或清理后调用）
    pub fn invalidate_token_cache(&self) {
        self.token_cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(
            infer_backend_from_url("sqlite://phishsim.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("sqlite::memory:").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://root@localhost/phish").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/phish").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }
}
