//! 基于客户端 IP 的限流器（追踪端点与登录共用）

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use crate::utils::ip::extract_client_ip_from_service_request;

/// 限流 key：连接 IP，经过私网代理时取 X-Forwarded-For。
/// 取不到 IP 时所有请求共用一个桶。
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        Ok(extract_client_ip_from_service_request(req).unwrap_or_else(|| "unknown".to_string()))
    }
}

/// 令牌桶：每 `seconds_per_request` 秒补充一个，最多突发 `burst` 次。
/// 超限返回 HTTP 429。
pub fn ip_rate_limiter(
    seconds_per_request: u64,
    burst: u32,
) -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(seconds_per_request)
        .burst_size(burst)
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!(
        "Rate limiter created: 1 req/{}s, burst {}",
        seconds_per_request, burst
    );
    Governor::new(&config)
}
