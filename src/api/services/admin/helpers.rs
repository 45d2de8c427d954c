//! Admin API 帮助函数

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::error;

use crate::api::middleware::AdminContext;
use crate::errors::PhishsimError;
use crate::services::Actor;
use crate::utils::ip::extract_client_ip;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 PhishsimError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
///
/// 5xx 不把内部细节透给客户端。
pub fn error_from_phishsim(err: &PhishsimError) -> HttpResponse {
    let status = err.http_status();
    let code = ErrorCode::from(err);
    if status.is_server_error() {
        error!("Admin API error: {}", err);
        let message = match err {
            PhishsimError::MailTransport(_) => "Mail delivery failed",
            _ => "Internal server error",
        };
        return error_response(status, code, message);
    }
    error_response(status, code, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<PhishsimError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_phishsim(&e.into()),
    }
}

/// 当前管理员 + 来源 IP，用于审计
pub fn actor_for(req: &HttpRequest, ctx: &AdminContext) -> Actor {
    Actor {
        user_id: Some(ctx.user_id),
        ip_address: extract_client_ip(req),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_success_response() {
        let response = success_response("success_data");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_error_response_not_found() {
        let response = error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "Resource not found",
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_error_from_phishsim_maps_status_and_code() {
        let err = PhishsimError::consent_required("Consent must be verified");
        let response = error_from_phishsim(&err);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], ErrorCode::ConsentRequired as i32);
        assert_eq!(json["message"], "Consent must be verified");
    }

    #[actix_rt::test]
    async fn test_internal_errors_are_masked() {
        let err = PhishsimError::database_operation("disk I/O error at page 42");
        let response = error_from_phishsim(&err);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }
}
