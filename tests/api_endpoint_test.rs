use axum::http::StatusCode;
use commission_ledger::api::{self, AppState};
use commission_ledger::db::init_db;
use commission_ledger::{Config, Decimal, Repository};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    _temp_dir: TempDir,
}

async fn setup_test_app(min_withdrawal: i64) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        db_max_connections: 5,
        min_withdrawal_amount: Decimal::from_units(min_withdrawal),
    };

    TestApp {
        app: api::create_router(AppState::new(repo, config)),
        _temp_dir: temp_dir,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Shop S1 owned by U1 with P1 at 15%.
async fn seed_shop(app: &axum::Router) {
    let (status, _) = send(
        app,
        "POST",
        "/v1/shops",
        Some(json!({"id": "S1", "ownerUserId": "U1", "name": "Shop One"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        "PUT",
        "/v1/rules",
        Some(json!({"shopId": "S1", "productId": "P1", "type": "percentage", "rate": "15"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rate"], "15");
    assert_eq!(body["active"], true);
}

async fn create(app: &axum::Router, order: &str, product: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/v1/commissions",
        Some(json!({
            "shopId": "S1",
            "orderId": order,
            "productId": product,
            "unitPrice": "10000",
            "quantity": 2
        })),
    )
    .await
}

#[tokio::test]
async fn test_create_commission_and_retry() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;

    let (status, body) = create(&t.app, "O1", "P1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "created");
    assert_eq!(body["commission"]["amount"], "3000");
    assert_eq!(body["commission"]["status"], "pending");
    assert!(body["commission"].get("approvedAtMs").is_none());

    let (status, retry) = create(&t.app, "O1", "P1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(retry["outcome"], "existing");
    assert_eq!(retry["commission"]["id"], body["commission"]["id"]);
}

#[tokio::test]
async fn test_create_without_rule_is_skipped() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;

    let (status, body) = create(&t.app, "O1", "unlinked").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "skipped");
    assert_eq!(body["reason"], "not_found");
    assert!(body.get("commission").is_none());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/commissions",
        Some(json!({
            "shopId": "S1",
            "orderId": "O1",
            "productId": "P1",
            "unitPrice": "10",
            "quantity": -1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/commissions",
        Some(json!({
            "shopId": "",
            "orderId": "O1",
            "productId": "P1",
            "unitPrice": "10",
            "quantity": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approve_twice_conflicts() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;
    let (_, body) = create(&t.app, "O1", "P1").await;
    let id = body["commission"]["id"].as_str().unwrap().to_string();

    let (status, approved) = send(&t.app, "POST", &format!("/v1/commissions/{}/approve", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert!(approved["approvedAtMs"].is_i64());

    let (status, body) = send(&t.app, "POST", &format!("/v1/commissions/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already processed"));

    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/commissions/00000000-0000-0000-0000-000000000000/approve",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "GET", "/v1/commissions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_earnings() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;
    create(&t.app, "O1", "P1").await;
    let (_, second) = create(&t.app, "O2", "P1").await;
    let id = second["commission"]["id"].as_str().unwrap().to_string();
    send(&t.app, "POST", &format!("/v1/commissions/{}/approve", id), None).await;

    let (status, list) = send(&t.app, "GET", "/v1/commissions?shop=S1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["commissions"].as_array().unwrap().len(), 2);

    let (_, pending) = send(&t.app, "GET", "/v1/commissions?shop=S1&status=pending", None).await;
    assert_eq!(pending["commissions"].as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, "GET", "/v1/commissions?shop=S1&status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, queue) = send(&t.app, "GET", "/v1/commissions/pending", None).await;
    assert_eq!(queue["commissions"].as_array().unwrap().len(), 1);

    let (_, earnings) = send(&t.app, "GET", "/v1/earnings?shop=S1", None).await;
    assert_eq!(earnings["totalPending"], "3000");
    assert_eq!(earnings["totalApproved"], "3000");
    assert_eq!(earnings["totalEarnings"], "6000");
    assert_eq!(earnings["commissionsCount"], 2);

    let (_, by_user) = send(&t.app, "GET", "/v1/earnings/user?user=U1", None).await;
    assert_eq!(by_user, earnings);
}

#[tokio::test]
async fn test_process_and_cancel_order() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/orders/commissions",
        Some(json!({
            "shopId": "S1",
            "orderId": "O9",
            "status": "confirmed",
            "lines": [
                {"productId": "P1", "unitPrice": "200", "quantity": 1},
                {"productId": "P2", "unitPrice": "50", "quantity": 4}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lines = body["lines"].as_array().unwrap();
    assert_eq!(lines[0]["outcome"], "created");
    assert_eq!(lines[0]["commission"]["amount"], "30");
    assert_eq!(lines[1]["outcome"], "skipped");
    assert_eq!(lines[1]["productId"], "P2");

    let (status, body) = send(&t.app, "POST", "/v1/orders/O9/cancel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"].as_array().unwrap().len(), 1);
    assert_eq!(body["cancelled"][0]["status"], "cancelled");
}

#[tokio::test]
async fn test_resolve_rule() {
    let t = setup_test_app(0).await;
    seed_shop(&t.app).await;

    let (_, body) = send(&t.app, "GET", "/v1/rules/resolve?shop=S1&product=P1", None).await;
    assert_eq!(body["status"], "eligible");
    assert_eq!(body["rule"]["type"], "percentage");
    assert_eq!(body["rule"]["rate"], "15");

    let (_, body) = send(&t.app, "GET", "/v1/rules/resolve?shop=S1&product=P9", None).await;
    assert_eq!(body["status"], "not_found");

    let (status, _) = send(
        &t.app,
        "PUT",
        "/v1/rules",
        Some(json!({"shopId": "S1", "productId": "P1", "type": "percentage", "rate": "101"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        "PUT",
        "/v1/rules",
        Some(json!({"shopId": "S404", "productId": "P1", "type": "fixed", "fixedAmount": "5"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_withdrawal_endpoints() {
    let t = setup_test_app(100).await;
    seed_shop(&t.app).await;
    let (_, body) = create(&t.app, "O1", "P1").await;
    let id = body["commission"]["id"].as_str().unwrap().to_string();
    send(&t.app, "POST", &format!("/v1/commissions/{}/approve", id), None).await;

    let (_, balance) = send(&t.app, "GET", "/v1/withdrawals/available?user=U1", None).await;
    assert_eq!(balance["available"], "3000");
    assert_eq!(balance["totalApproved"], "3000");

    let (status, _) = send(
        &t.app,
        "POST",
        "/v1/withdrawals",
        Some(json!({"userId": "U1", "amount": "50"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, w) = send(
        &t.app,
        "POST",
        "/v1/withdrawals",
        Some(json!({"userId": "U1", "amount": "2000"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(w["status"], "pending");
    let wid = w["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        "POST",
        "/v1/withdrawals",
        Some(json!({"userId": "U1", "amount": "2000"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("insufficient funds"));

    let (_, queue) = send(&t.app, "GET", "/v1/withdrawals/pending", None).await;
    assert_eq!(queue["withdrawals"].as_array().unwrap().len(), 1);

    let (status, done) = send(
        &t.app,
        "POST",
        &format!("/v1/withdrawals/{}/complete", wid),
        Some(json!({"adminNote": "paid via bank"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");
    assert_eq!(done["adminNote"], "paid via bank");

    let (status, _) = send(&t.app, "POST", &format!("/v1/withdrawals/{}/reject", wid), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = send(&t.app, "GET", "/v1/withdrawals?user=U1&status=completed", None).await;
    assert_eq!(listed["withdrawals"].as_array().unwrap().len(), 1);

    let (_, balance) = send(&t.app, "GET", "/v1/withdrawals/available?user=U1", None).await;
    assert_eq!(balance["available"], "1000");
    assert_eq!(balance["totalCompleted"], "2000");
}
