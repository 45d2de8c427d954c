//! Admin API 认证相关端点

use actix_governor::Governor;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use tracing::{error, info};

use crate::api::jwt::get_jwt_service;
use crate::api::middleware::AdminContext;
use crate::api::services::rate_limit::{ClientIpKeyExtractor, ip_rate_limiter};
use crate::services::UserService;
use crate::utils::ip::extract_client_ip;

use super::error_code::ErrorCode;
use super::helpers::{
    actor_for, api_result, error_from_phishsim, error_response, success_response,
};
use super::types::{
    AuthSuccessResponse, ChangePasswordRequest, LoginCredentials, MessageResponse, VerifyResponse,
};

/// 登录限流：每秒补充 1 个令牌，突发最多 5 次
pub fn login_rate_limiter() -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    ip_rate_limiter(1, 5)
}

/// 用户名密码登录，成功返回 Bearer access token
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginCredentials>,
    users: web::Data<UserService>,
) -> ActixResult<impl Responder> {
    let LoginCredentials { username, password } = body.into_inner();

    let user = match users
        .authenticate(&username, &password, extract_client_ip(&req))
        .await
    {
        Ok(user) => user,
        Err(e) => return Ok(error_from_phishsim(&e)),
    };

    let jwt_service = get_jwt_service();
    let access_token = match jwt_service.generate_access_token(user.id, &user.username) {
        Ok(token) => token,
        Err(e) => {
            error!("Admin API: failed to generate access token: {}", e);
            return Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalServerError,
                "Failed to generate token",
            ));
        }
    };

    info!("Admin API: login successful for '{}'", user.username);
    Ok(success_response(AuthSuccessResponse {
        access_token,
        token_type: "Bearer",
        expires_in: jwt_service.access_token_minutes() * 60,
        user,
    }))
}

/// 验证 token - 中间件通过即有效
pub async fn verify_token(ctx: AdminContext) -> ActixResult<impl Responder> {
    Ok(success_response(VerifyResponse {
        user_id: ctx.user_id,
        username: ctx.username,
    }))
}

/// 修改当前管理员密码
pub async fn change_password(
    req: HttpRequest,
    ctx: AdminContext,
    body: web::Json<ChangePasswordRequest>,
    users: web::Data<UserService>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    if body.new_password != body.confirm_password {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationFailed,
            "Passwords must match",
        ));
    }

    let actor = actor_for(&req, &ctx);
    let result = users
        .change_password(ctx.user_id, &body.current_password, &body.new_password, &actor)
        .await
        .map(|_| MessageResponse {
            message: "Password changed".to_string(),
        });
    Ok(api_result(result))
}
