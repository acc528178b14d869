mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{MemoryDirectory, MemoryLedger};
use coupon_redemption_service::handlers::{self, AppState};
use coupon_redemption_service::services::directory::Directory;
use coupon_redemption_service::services::ledger::UsageLedger;
use coupon_redemption_service::services::redemption::RedemptionService;

fn test_app() -> Router {
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::default());
    let ledger: Arc<dyn UsageLedger> = Arc::new(MemoryLedger::default());
    let redemption = Arc::new(RedemptionService::new(Arc::clone(&directory), ledger));

    handlers::router(AppState {
        directory,
        redemption,
    })
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn healthcheck_reports_alive() {
    let app = test_app();

    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_alive"], json!(true));
    assert_eq!(body["app_name"], json!("coupon-redemption-service"));
}

#[tokio::test]
async fn user_registration_roundtrip() {
    let app = test_app();

    let (status, body) =
        send_json(&app, "POST", "/api/users", json!({"username": "alice"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], json!(true));
    assert_eq!(body["code"], json!("created"));

    // Re-registering the same name is a distinct outcome, not an error.
    let (status, body) =
        send_json(&app, "POST", "/api/users", json!({"username": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], json!(false));
    assert_eq!(body["code"], json!("already_exists"));

    let (status, body) = get(&app, "/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], json!(["alice"]));
}

#[tokio::test]
async fn coupon_with_negative_limit_is_rejected() {
    let app = test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/coupons",
        json!({
            "name": "BROKEN",
            "limits": {
                "global_total": -1,
                "user_total": 3,
                "user_daily": 1,
                "user_weekly": 1
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));

    let (_, body) = get(&app, "/api/coupons").await;
    assert_eq!(body["coupons"], json!([]));
}

#[tokio::test]
async fn apply_flow_over_http() {
    let app = test_app();

    send_json(&app, "POST", "/api/users", json!({"username": "alice"})).await;
    send_json(&app, "POST", "/api/users", json!({"username": "bob"})).await;
    send_json(
        &app,
        "POST",
        "/api/coupons",
        json!({
            "name": "WELCOME10",
            "limits": {
                "global_total": 2,
                "user_total": 1,
                "user_daily": 1,
                "user_weekly": 1
            }
        }),
    )
    .await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/coupons/apply",
        json!({"coupon_name": "WELCOME10", "username": "alice"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redeemed"], json!(true));
    assert_eq!(body["message"], json!("Redeemed discount"));
    assert_eq!(body["username"], json!("alice"));
    assert_eq!(body["coupon_name"], json!("WELCOME10"));

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/coupons/apply",
        json!({"coupon_name": "WELCOME10", "username": "alice"}),
    )
    .await;
    assert_eq!(body["redeemed"], json!(false));
    assert_eq!(
        body["message"],
        json!("User has exhausted the number of times he/she can use a particular coupon")
    );

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/coupons/apply",
        json!({"coupon_name": "WELCOME10", "username": "bob"}),
    )
    .await;
    assert_eq!(body["redeemed"], json!(true));
}

#[tokio::test]
async fn apply_with_unknown_names_reports_refusals() {
    let app = test_app();

    send_json(&app, "POST", "/api/users", json!({"username": "alice"})).await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/coupons/apply",
        json!({"coupon_name": "NOPE", "username": "mallory"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redeemed"], json!(false));
    assert_eq!(body["message"], json!("Not a valid user"));

    let (_, body) = send_json(
        &app,
        "POST",
        "/api/coupons/apply",
        json!({"coupon_name": "NOPE", "username": "alice"}),
    )
    .await;
    assert_eq!(body["message"], json!("Not a valid coupon"));
}
