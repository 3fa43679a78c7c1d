//! End-to-end tests for the paid and free registration flows: order
//! creation against a mocked gateway, signature verification, idempotent
//! confirmation, and the (event, user) uniqueness invariant.

mod common;

use common::{gateway_signature, TestApp, TEST_KEY_ID, TEST_USER_ID};
use registration_service::models::RegistrationStatus;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORDER_ID: &str = "order_Mx3kZn9qL2pTvA";

async fn mock_gateway(expected_amount: i64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ORDER_ID,
            "entity": "order",
            "amount": expected_amount,
            "amount_paid": 0,
            "amount_due": expected_amount,
            "currency": "INR",
            "receipt": "evt_1",
            "status": "created",
            "attempts": 0,
            "created_at": 1_700_000_000
        })))
        .mount(&server)
        .await;
    server
}

async fn create_order(app: &TestApp, event_id: &str, amount: i64) -> serde_json::Value {
    let response = app
        .as_user(app.client.post(format!("{}/orders", app.address)))
        .json(&json!({ "eventId": event_id, "amount": amount }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn verify(app: &TestApp, order_id: &str, payment_id: &str, signature: &str) -> reqwest::Response {
    app.as_user(app.client.post(format!("{}/payments/verify", app.address)))
        .json(&json!({
            "razorpay_order_id": order_id,
            "razorpay_payment_id": payment_id,
            "razorpay_signature": signature,
            "eventId": "evt-paid",
        }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn create_order_requires_authentication() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/orders", app.address))
        .json(&json!({ "eventId": "evt-1", "amount": 4900 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "unauthorized");
}

#[tokio::test]
async fn create_order_rejects_missing_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .as_user(app.client.post(format!("{}/orders", app.address)))
        .json(&json!({ "eventId": "evt-1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "missing_fields");
}

#[tokio::test]
async fn paid_registration_with_valid_signature_confirms() {
    let gateway = mock_gateway(4900).await;
    let app = TestApp::spawn_with_gateway(&gateway.uri()).await;

    let order = create_order(&app, "evt-paid", 4900).await;
    assert_eq!(order["orderId"], ORDER_ID);
    assert_eq!(order["amount"], 4900);
    assert_eq!(order["keyId"], TEST_KEY_ID);

    // The pending row exists before any payment.
    let pending = app
        .store
        .find_registration_by_order_id(ORDER_ID)
        .await
        .unwrap()
        .expect("pending registration should exist");
    assert_eq!(pending.status, RegistrationStatus::Pending);
    assert_eq!(pending.amount, 4900);
    assert_eq!(pending.user_id, TEST_USER_ID);

    let signature = gateway_signature(ORDER_ID, "pay_9FkZn1");
    let response = verify(&app, ORDER_ID, "pay_9FkZn1", &signature).await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let confirmed = app
        .store
        .find_registration_by_order_id(ORDER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, RegistrationStatus::Confirmed);
    assert_eq!(confirmed.amount, 4900);
    assert_eq!(confirmed.razorpay_payment_id.as_deref(), Some("pay_9FkZn1"));
}

#[tokio::test]
async fn verification_is_idempotent() {
    let gateway = mock_gateway(4900).await;
    let app = TestApp::spawn_with_gateway(&gateway.uri()).await;

    create_order(&app, "evt-paid", 4900).await;
    let signature = gateway_signature(ORDER_ID, "pay_once");

    let first = verify(&app, ORDER_ID, "pay_once", &signature).await;
    assert_eq!(first.status(), 200);
    let second = verify(&app, ORDER_ID, "pay_once", &signature).await;
    assert_eq!(second.status(), 200);

    // Exactly one confirmed row for the user, confirmed exactly once.
    let registrations = app
        .store
        .list_registrations_for_user(TEST_USER_ID)
        .await
        .unwrap();
    let confirmed: Vec<_> = registrations
        .iter()
        .filter(|r| r.status == RegistrationStatus::Confirmed)
        .collect();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].razorpay_payment_id.as_deref(), Some("pay_once"));
}

#[tokio::test]
async fn tampered_signature_is_rejected_and_registration_stays_pending() {
    let gateway = mock_gateway(4900).await;
    let app = TestApp::spawn_with_gateway(&gateway.uri()).await;

    create_order(&app, "evt-paid", 4900).await;

    let mut tampered = gateway_signature(ORDER_ID, "pay_evil").into_bytes();
    tampered[10] = if tampered[10] == b'a' { b'b' } else { b'a' };
    let tampered = String::from_utf8(tampered).unwrap();

    let response = verify(&app, ORDER_ID, "pay_evil", &tampered).await;
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "invalid_signature");

    let row = app
        .store
        .find_registration_by_order_id(ORDER_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, RegistrationStatus::Pending);
    assert!(row.razorpay_payment_id.is_none());
}

#[tokio::test]
async fn verification_of_unknown_order_is_not_found() {
    let app = TestApp::spawn().await;

    let signature = gateway_signature("order_ghost", "pay_ghost");
    let response = verify(&app, "order_ghost", "pay_ghost", &signature).await;

    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "registration_not_found");
}

#[tokio::test]
async fn verify_rejects_missing_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .as_user(app.client.post(format!("{}/payments/verify", app.address)))
        .json(&json!({
            "razorpay_order_id": "order_x",
            "razorpay_payment_id": "pay_x",
            // signature and eventId missing
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "missing_fields");
}

#[tokio::test]
async fn free_registration_confirms_without_touching_the_gateway() {
    let gateway = MockServer::start().await;
    // Any request to the gateway fails the test.
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&gateway)
        .await;
    let app = TestApp::spawn_with_gateway(&gateway.uri()).await;

    let response = app
        .as_user(app.client.post(format!("{}/registrations", app.address)))
        .json(&json!({ "eventId": "evt-free" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["amount"], 0);
    assert_eq!(body["status"], "CONFIRMED");

    let registrations = app
        .store
        .list_registrations_for_user(TEST_USER_ID)
        .await
        .unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].event_id, "evt-free");
    assert_eq!(registrations[0].amount, 0);
}

#[tokio::test]
async fn duplicate_free_registration_is_a_conflict() {
    let app = TestApp::spawn().await;

    let first = app
        .as_user(app.client.post(format!("{}/registrations", app.address)))
        .json(&json!({ "eventId": "evt-free" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);

    let second = app
        .as_user(app.client.post(format!("{}/registrations", app.address)))
        .json(&json!({ "eventId": "evt-free" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["reason"], "already_registered");
}

#[tokio::test]
async fn listing_returns_the_callers_registrations() {
    let app = TestApp::spawn().await;

    app.as_user(app.client.post(format!("{}/registrations", app.address)))
        .json(&json!({ "eventId": "evt-free" }))
        .send()
        .await
        .unwrap();

    let response = app
        .as_user(app.client.get(format!("{}/registrations", app.address)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["event_id"], "evt-free");

    // Another signed-in user sees nothing.
    let response = app
        .client
        .get(format!("{}/registrations", app.address))
        .header("X-User-Id", "someone-else")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn gateway_failure_surfaces_as_bad_gateway() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "BAD_REQUEST_ERROR", "description": "Authentication failed" }
        })))
        .mount(&gateway)
        .await;
    let app = TestApp::spawn_with_gateway(&gateway.uri()).await;

    let response = app
        .as_user(app.client.post(format!("{}/orders", app.address)))
        .json(&json!({ "eventId": "evt-1", "amount": 4900 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reason"], "gateway_error");
}
