//! Admin API HTTP 集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use phishsim::api::jwt::get_jwt_service;
use phishsim::api::middleware::AdminAuth;
use phishsim::api::services::{AppStartTime, admin_v1_routes, health_routes};
use phishsim::runtime::lifetime::startup::AppServices;
use phishsim::services::AuditAction;

use common::{enroll, new_storage, seed_campaign, seed_template, services};

macro_rules! admin_app {
    ($svc:expr) => {{
        let svc: AppServices = $svc.clone();
        test::init_service(
            App::new()
                .configure(|cfg| svc.configure(cfg))
                .app_data(web::Data::new(AppStartTime {
                    start_datetime: chrono::Utc::now(),
                }))
                .service(health_routes())
                .service(web::scope("/admin").wrap(AdminAuth).service(admin_v1_routes())),
        )
        .await
    }};
}

fn bearer(user_id: i64, username: &str) -> (String, String) {
    let token = get_jwt_service()
        .generate_access_token(user_id, username)
        .unwrap();
    ("Authorization".to_string(), format!("Bearer {}", token))
}

fn multipart_csv(boundary: &str, csv: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"targets.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        csv = csv
    )
}

#[actix_rt::test]
async fn test_requests_without_token_are_rejected() {
    let (_dir, storage) = new_storage().await;
    let app = admin_app!(services(&storage));

    for uri in [
        "/admin/v1/campaigns",
        "/admin/v1/templates",
        "/admin/v1/analytics/data?type=platform_overview",
        "/admin/v1/audit",
    ] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/campaigns")
            .insert_header(("Authorization", "Bearer not.a.jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_login_then_verify() {
    let (_dir, storage) = new_storage().await;
    let svc = services(&storage);
    svc.users
        .create_admin("secops", "secops@corp.com", "correct-horse-battery")
        .await
        .unwrap();
    let app = admin_app!(svc);

    // 密码错误
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/admin/v1/auth/login")
            .set_json(json!({ "username": "secops", "password": "wrong-password" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/admin/v1/auth/login")
            .set_json(json!({ "username": "secops", "password": "correct-horse-battery" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["token_type"], "Bearer");
    // 不返回密码哈希
    assert!(body["data"]["user"].get("password_hash").is_none());
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/auth/verify")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["username"], "secops");
}

#[actix_rt::test]
async fn test_change_password() {
    let (_dir, storage) = new_storage().await;
    let svc = services(&storage);
    let user = svc
        .users
        .create_admin("secops", "secops@corp.com", "correct-horse-battery")
        .await
        .unwrap();
    let app = admin_app!(svc);
    let auth = bearer(user.id, "secops");

    let change = |current: &str, new: &str, confirm: &str| {
        TestRequest::post()
            .uri("/admin/v1/auth/password")
            .insert_header(auth.clone())
            .set_json(json!({
                "current_password": current,
                "new_password": new,
                "confirm_password": confirm,
            }))
            .to_request()
    };

    for (current, new, confirm) in [
        ("wrong-password", "staple-orbit-lantern", "staple-orbit-lantern"),
        ("correct-horse-battery", "staple-orbit-lantern", "staple-orbit-lanterns"),
        ("correct-horse-battery", "short", "short"),
    ] {
        let resp = test::call_service(&app, change(current, new, confirm)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} / {}", current, new);
    }

    let resp = test::call_service(
        &app,
        change(
            "correct-horse-battery",
            "staple-orbit-lantern",
            "staple-orbit-lantern",
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(
        svc.users
            .authenticate("secops", "correct-horse-battery", None)
            .await
            .is_err()
    );
    assert!(
        svc.users
            .authenticate("secops", "staple-orbit-lantern", None)
            .await
            .is_ok()
    );

    let audit = svc
        .audit
        .recent(None, Some(AuditAction::PasswordChanged), 10)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].user_id, Some(user.id));
    assert_eq!(audit[0].resource_id, Some(user.id));
}

#[actix_rt::test]
async fn test_target_directory_via_api() {
    let (_dir, storage) = new_storage().await;
    let campaign = seed_campaign(&storage, "Directory drill").await;
    enroll(&storage, campaign.id, "ann@corp.com", Some("Finance")).await;
    enroll(&storage, campaign.id, "bob@corp.com", Some("Sales")).await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/targets?search=sales")
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(body["data"][0]["email"], "bob@corp.com");
}

#[actix_rt::test]
async fn test_template_test_send_without_transport_is_bad_gateway() {
    let (_dir, storage) = new_storage().await;
    let template = seed_template(&storage).await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("/admin/v1/templates/{}/test", template.id))
            .insert_header(bearer(1, "secops"))
            .set_json(json!({ "email": "secops@corp.com" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[actix_rt::test]
async fn test_create_template_and_campaign_via_api() {
    let (_dir, storage) = new_storage().await;
    let app = admin_app!(services(&storage));
    let auth = bearer(1, "secops");

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/admin/v1/templates")
            .insert_header(auth.clone())
            .set_json(json!({
                "name": "Invoice overdue",
                "subject": "Invoice for {{first_name}}",
                "html_content": "<a href=\"{{click_url}}\">Open invoice</a>{{tracking_pixel}}"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let template_id = body["data"]["id"].as_i64().unwrap();

    // 未知模板变量
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/admin/v1/templates")
            .insert_header(auth.clone())
            .set_json(json!({
                "name": "Broken",
                "subject": "Hello {{ssn}}",
                "html_content": "<p>hi</p>"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/admin/v1/campaigns")
            .insert_header(auth.clone())
            .set_json(json!({ "name": "Q3 finance drill", "template_id": template_id }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "draft");
    let campaign_id = body["data"]["id"].as_i64().unwrap();

    // 未确认授权不能发送
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("/admin/v1/campaigns/{}/send", campaign_id))
            .insert_header(auth.clone())
            .to_request(),
    )
    .await;
    assert!(resp.status().is_client_error());

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/campaigns/9999")
            .insert_header(auth)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_import_targets_via_multipart() {
    let (_dir, storage) = new_storage().await;
    let campaign = seed_campaign(&storage, "Import drill").await;
    let app = admin_app!(services(&storage));

    let boundary = "----phishsim-boundary";
    let csv = "email,first_name,last_name,department\n\
               a@corp.com,Ann,Lee,Finance\n\
               not-an-email,Bob,Ray,Sales\n\
               b@corp.com,Cid,Moe,Sales\n";
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("/admin/v1/campaigns/{}/targets/import", campaign.id))
            .insert_header(bearer(1, "secops"))
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(multipart_csv(boundary, csv))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["created_count"], 2);
    assert_eq!(body["data"]["rejected_rows"][0]["row"], 3);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri(&format!("/admin/v1/campaigns/{}/targets", campaign.id))
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().map(|a| a.len()), Some(2));
}

#[actix_rt::test]
async fn test_export_returns_csv_attachment() {
    let (_dir, storage) = new_storage().await;
    let campaign = seed_campaign(&storage, "Export drill").await;
    enroll(&storage, campaign.id, "alice@corp.com", Some("Finance")).await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri(&format!("/admin/v1/campaigns/{}/export", campaign.id))
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains(&format!("campaign_{}_results_", campaign.id)));

    let body = test::read_body(resp).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.lines().count() >= 2);
    assert!(text.contains("alice@corp.com"));
}

#[actix_rt::test]
async fn test_analytics_requires_campaign_id() {
    let (_dir, storage) = new_storage().await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/analytics/data?type=campaign_metrics")
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/admin/v1/analytics/data?type=platform_overview")
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_template_in_use_cannot_be_deleted() {
    let (_dir, storage) = new_storage().await;
    let campaign = seed_campaign(&storage, "Uses template").await;
    let unused = seed_template(&storage).await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(
        &app,
        TestRequest::delete()
            .uri(&format!("/admin/v1/templates/{}", campaign.template_id))
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(
        &app,
        TestRequest::delete()
            .uri(&format!("/admin/v1/templates/{}", unused.id))
            .insert_header(bearer(1, "secops"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_health_check_reports_database() {
    let (_dir, storage) = new_storage().await;
    let app = admin_app!(services(&storage));

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["database"]["status"], "healthy");

    let resp =
        test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
