//! HTTP 层：追踪端点、管理 API、健康检查

pub mod jwt;
pub mod middleware;
pub mod services;
