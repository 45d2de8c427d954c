//! 客户端 IP 提取
//!
//! 连接来自私有/回环地址时视为经过反向代理，取 X-Forwarded-For 的第一个地址；
//! 公网直连时只信任连接地址，防止伪造。

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::dev::ServiceRequest;
use actix_web::http::header::HeaderMap;

pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10
        }
    }
}

fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| peer.parse::<IpAddr>())
        .ok()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| v.parse::<IpAddr>().is_ok())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| v.parse::<IpAddr>().is_ok())
                .map(str::to_string)
        })
}

fn resolve(peer: Option<IpAddr>, headers: &HeaderMap) -> Option<String> {
    match peer {
        Some(ip) if is_private_or_local(&ip) => {
            forwarded_ip(headers).or_else(|| Some(ip.to_string()))
        }
        Some(ip) => Some(ip.to_string()),
        None => forwarded_ip(headers),
    }
}

pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let peer = req.peer_addr().map(|s| s.ip()).or_else(|| {
        req.connection_info()
            .peer_addr()
            .and_then(parse_peer)
    });
    resolve(peer, req.headers())
}

/// 中间件/限流器使用的版本
pub fn extract_client_ip_from_service_request(req: &ServiceRequest) -> Option<String> {
    let peer = req.peer_addr().map(|s| s.ip());
    resolve(peer, req.headers())
}
