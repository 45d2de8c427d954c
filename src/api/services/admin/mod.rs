//! Admin API 服务模块
//!
//! 该模块包含管理 API 的所有端点，包括：
//! - 认证（登录、token 验证）
//! - 模板与活动管理
//! - 收件人导入导出
//! - 分析统计、合规报告与数据清理

pub mod analytics;
pub mod auth;
mod campaigns;
pub mod error_code;
mod helpers;
mod reports;
pub mod routes;
mod targets;
mod targets_directory;
mod templates;
mod types;

// 重新导出类型
pub use types::*;

// 重新导出帮助函数
pub use helpers::{
    actor_for, api_result, created_response, error_from_phishsim, error_response,
    success_response,
};

// 重新导出错误码
pub use error_code::ErrorCode;

pub use routes::admin_v1_routes;
pub use targets::MAX_IMPORT_FILE_SIZE;
