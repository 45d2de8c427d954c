//! 追踪端点：像素、点击、表单提交
//!
//! 无认证，token 是唯一凭据。真假 token 的响应逐字节一致，
//! 失败只进日志，不回传给收件人。

use std::sync::LazyLock;

use actix_governor::Governor;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use base64::Engine;
use governor::middleware::NoOpMiddleware;
use serde_json::json;
use tracing::{debug, trace, warn};

use crate::errors::PhishsimError;
use crate::services::{Actor, AuditAction, AuditService, EventContext, EventRecorder, TokenIssuer};
use crate::storage::{EventType, TokenBinding};
use crate::utils::ip::extract_client_ip;

use super::rate_limit::{ClientIpKeyExtractor, ip_rate_limiter};

const PIXEL_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

static PIXEL_PNG: LazyLock<Vec<u8>> = LazyLock::new(|| {
    base64::engine::general_purpose::STANDARD
        .decode(PIXEL_BASE64)
        .unwrap_or_default()
});

pub const SUBMIT_MESSAGE: &str =
    "Thank you for participating in this security awareness training.";

const TRAINING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="robots" content="noindex, nofollow">
<title>Security Awareness Training</title>
<style>
body{font-family:-apple-system,Segoe UI,Roboto,sans-serif;background:#f5f6f8;color:#212529;margin:0}
main{max-width:720px;margin:40px auto;background:#fff;border-radius:8px;padding:32px;box-shadow:0 2px 8px rgba(0,0,0,.08)}
h1{color:#b02a37;margin-top:0}
.notice{background:#fff3cd;border:1px solid #ffe69c;padding:12px 16px;border-radius:6px}
li{margin:6px 0}
form{margin-top:24px;border-top:1px solid #dee2e6;padding-top:16px}
input{display:block;width:100%;padding:8px;margin:6px 0 12px;box-sizing:border-box}
button{background:#0d6efd;color:#fff;border:0;padding:10px 18px;border-radius:4px;cursor:pointer}
#result{margin-top:12px;font-weight:600}
</style>
</head>
<body>
<main>
<h1>This was a simulated phishing email</h1>
<p class="notice">No harm done. The message you just clicked was part of an authorized security awareness exercise run by your organization.</p>
<h2>How to spot phishing next time</h2>
<ul>
<li><strong>Urgency:</strong> "act now", "immediately", "limited time" are pressure tactics.</li>
<li><strong>Threats:</strong> warnings about suspended or closed accounts are a common lure.</li>
<li><strong>Generic greetings:</strong> "Dear user" or "Dear customer" instead of your name.</li>
<li><strong>Suspicious links:</strong> hover before clicking; shorteners and look-alike domains hide the real destination.</li>
<li><strong>Credential requests:</strong> legitimate teams never ask for your password by email.</li>
</ul>
<p>When in doubt, report the message to your IT or security team.</p>
<form id="practice" method="post">
<p>Practice form: nothing you type here is stored.</p>
<label for="u">Username</label><input id="u" name="username" autocomplete="off">
<label for="p">Password</label><input id="p" name="password" type="password" autocomplete="off">
<button type="submit">Submit</button>
<div id="result"></div>
</form>
</main>
<script>
(function(){
var f=document.getElementById('practice');
f.action=location.pathname.replace('/click/','/submit/');
f.addEventListener('submit',function(e){
e.preventDefault();
fetch(f.action,{method:'POST',body:new FormData(f)})
.then(function(r){return r.json();})
.then(function(d){document.getElementById('result').textContent=d.message||'';f.reset();})
.catch(function(){});
});
})();
</script>
</body>
</html>
"#;

/// 30 次/分钟
pub fn open_rate_limiter() -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    ip_rate_limiter(2, 30)
}

/// 20 次/分钟
pub fn click_rate_limiter() -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    ip_rate_limiter(3, 20)
}

/// 10 次/5 分钟
pub fn submit_rate_limiter() -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    ip_rate_limiter(30, 10)
}

fn event_context(req: &HttpRequest) -> EventContext {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    EventContext {
        ip_address: extract_client_ip(req),
        user_agent: header("user-agent"),
        metadata: None,
    }
}

fn log_failure(kind: EventType, err: &PhishsimError) {
    match err {
        PhishsimError::NotFound(_) => debug!("Ignoring {} hit with unknown token", kind),
        other => warn!("Failed to record {} event: {}", kind, other),
    }
}

async fn resolve_token(issuer: &TokenIssuer, token: &str, kind: EventType) -> Option<TokenBinding> {
    match issuer.resolve(token).await {
        Ok(binding) => Some(binding),
        Err(e) => {
            log_failure(kind, &e);
            None
        }
    }
}

async fn record_hit(
    issuer: &TokenIssuer,
    recorder: &EventRecorder,
    token: &str,
    kind: EventType,
    context: EventContext,
) -> Option<TokenBinding> {
    let binding = resolve_token(issuer, token, kind).await?;
    match recorder
        .record_for(binding.campaign_target_id, kind, chrono::Utc::now(), context)
        .await
    {
        Ok(_) => Some(binding),
        Err(e) => {
            log_failure(kind, &e);
            None
        }
    }
}

fn pixel_response() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("image/png")
        .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
        .insert_header(("Pragma", "no-cache"))
        .insert_header(("Expires", "0"))
        .body(PIXEL_PNG.as_slice())
}

fn training_page_response() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .insert_header(("Cache-Control", "no-store"))
        .insert_header(("X-Robots-Tag", "noindex, nofollow"))
        .body(TRAINING_PAGE)
}

fn submit_response() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": SUBMIT_MESSAGE,
    }))
}

pub async fn track_open(
    req: HttpRequest,
    token: web::Path<String>,
    issuer: web::Data<TokenIssuer>,
    recorder: web::Data<EventRecorder>,
) -> impl Responder {
    trace!("Tracking pixel requested");
    let referer = req
        .headers()
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let mut context = event_context(&req);
    if let Some(referer) = referer {
        context = context.with_metadata(json!({ "referer": referer }));
    }
    record_hit(&issuer, &recorder, &token, EventType::Opened, context).await;
    pixel_response()
}

pub async fn track_click(
    req: HttpRequest,
    token: web::Path<String>,
    issuer: web::Data<TokenIssuer>,
    recorder: web::Data<EventRecorder>,
) -> impl Responder {
    record_hit(&issuer, &recorder, &token, EventType::Clicked, event_context(&req)).await;
    training_page_response()
}

/// 表单内容从不读取，只记录"提交过"这一事实
pub async fn track_submit(
    req: HttpRequest,
    token: web::Path<String>,
    issuer: web::Data<TokenIssuer>,
    recorder: web::Data<EventRecorder>,
    audit: web::Data<AuditService>,
) -> impl Responder {
    let context = event_context(&req).with_metadata(json!({ "form_data_received": true }));
    let ip_address = context.ip_address.clone();

    if let Some(binding) =
        record_hit(&issuer, &recorder, &token, EventType::Submitted, context).await
    {
        audit
            .log(
                &Actor {
                    user_id: None,
                    ip_address,
                },
                AuditAction::PhishingSubmitted,
                Some(("campaign_target", binding.campaign_target_id)),
                Some(json!({ "campaign_id": binding.campaign_id })),
            )
            .await;
    }

    submit_response()
}

/// 追踪路由，每个端点单独限流
pub fn tracking_routes() -> actix_web::Scope {
    web::scope("/track")
        .service(
            web::resource("/open/{token}")
                .wrap(open_rate_limiter())
                .route(web::get().to(track_open)),
        )
        .service(
            web::resource("/click/{token}")
                .wrap(click_rate_limiter())
                .route(web::get().to(track_click)),
        )
        .service(
            web::resource("/submit/{token}")
                .wrap(submit_rate_limiter())
                .route(web::post().to(track_submit)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_is_png() {
        assert!(PIXEL_PNG.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn test_training_page_has_no_token_specific_content() {
        assert!(!TRAINING_PAGE.contains("{{"));
        assert!(TRAINING_PAGE.contains("replace('/click/','/submit/')"));
    }
}
