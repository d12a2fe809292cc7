use actix_web::http::StatusCode;
use chama_common::Cents;
use chama_ledger::{
    db_types::PaymentStatus,
    traits::{ChargeStatus, GatewayCharge, GatewayError, LedgerQueries, PaymentDatabase},
};
use serde_json::{json, Value};

use super::helpers::{charge_success, sign, TestServer};

async fn open_topup_session(server: &TestServer, amount: i64) -> String {
    let body = json!({
        "email": "alice@example.com",
        "amount": amount,
        "purpose": "wallet_topup",
        "chamaId": server.chama_id()
    });
    let (status, body) = server.post_as("user-alice", "/api/payments/initialize", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));
    let reference = body["reference"].as_str().expect("No reference in response").to_string();
    assert_eq!(body["authorizationUrl"], Value::String(format!("https://checkout.example.com/{reference}")));
    reference
}

async fn mgr_balance(server: &TestServer) -> Cents {
    let alice = server.db.fetch_member(server.seed.alice.id).await.unwrap().unwrap();
    alice.mgr_balance
}

#[actix_web::test]
async fn initialize_opens_a_pending_payment() {
    let server = TestServer::new().await;
    let reference = open_topup_session(&server, 1000).await;
    let sessions = server.gateway.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].amount, Cents::from_shillings(1000));
    assert_eq!(sessions[0].reference, reference);

    let payment = server.db.fetch_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.member_id, Some(server.seed.alice.id));
}

#[actix_web::test]
async fn gateway_rejections_are_bad_gateway_errors() {
    let server = TestServer::new().await;
    server.gateway.fail_initialize_with(Some(GatewayError::Rejected("Invalid key".into())));
    let body = json!({ "email": "alice@example.com", "amount": 50, "purpose": "other" });
    let (status, body) = server.post_as("user-alice", "/api/payments/initialize", body).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], json!(false));

    let (_, payments) = server.get_as("user-alice", "/api/payments").await;
    assert_eq!(payments[0]["status"], json!("failed"));
}

#[actix_web::test]
async fn outsiders_cannot_top_up_a_chama_wallet() {
    let server = TestServer::new().await;
    let body =
        json!({ "email": "eve@example.com", "amount": 50, "purpose": "wallet_topup", "chamaId": server.chama_id() });
    let (status, _) = server.post_as("user-eve", "/api/payments/initialize", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(server.gateway.sessions().is_empty());
}

#[actix_web::test]
async fn webhooks_with_a_bad_signature_are_acknowledged_but_ignored() {
    let server = TestServer::new().await;
    let reference = open_topup_session(&server, 1000).await;
    let body = charge_success(&reference, 100_000);

    let (status, response) = server.post_webhook(&body, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": false, "message": "No signature found." }));

    let (status, response) = server.post_webhook(&body, Some("00ff".repeat(32))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": false, "message": "Invalid signature." }));

    let payment = server.db.fetch_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(mgr_balance(&server).await, Cents::from(0));
}

#[actix_web::test]
async fn signed_webhooks_settle_the_payment_once() {
    let server = TestServer::new().await;
    let reference = open_topup_session(&server, 1000).await;
    let body = charge_success(&reference, 100_000);

    let (status, response) = server.post_webhook(&body, Some(sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true, "message": "Webhook received" }));
    // 2.5% platform fee
    assert_eq!(mgr_balance(&server).await, Cents::from_shillings(975));
    let payment = server.db.fetch_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(payment.fee, Some(Cents::from_shillings(25)));

    let (status, response) = server.post_webhook(&body, Some(sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], json!(true));
    assert_eq!(mgr_balance(&server).await, Cents::from_shillings(975));
}

#[actix_web::test]
async fn webhooks_for_unknown_references_are_acknowledged() {
    let server = TestServer::new().await;
    let body = charge_success("CHM-does-not-exist", 100_000);
    let (status, response) = server.post_webhook(&body, Some(sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true, "message": "Webhook received" }));
}

#[actix_web::test]
async fn webhooks_that_cannot_be_applied_are_acknowledged_without_details() {
    let server = TestServer::new().await;
    let reference = open_topup_session(&server, 1000).await;
    let path = format!("/api/members/{}/{}/deactivate", server.chama_id(), server.seed.alice.id);
    let (status, _) = server.post_as("user-admin", &path, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let body = charge_success(&reference, 100_000);
    let (status, response) = server.post_webhook(&body, Some(sign(&body))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "success": true, "message": "Webhook received" }));
    assert!(!response.to_string().contains("active member"));

    let payment = server.db.fetch_payment(&reference).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(mgr_balance(&server).await, Cents::from(0));
}

#[actix_web::test]
async fn verification_settles_a_payment_the_webhook_missed() {
    let server = TestServer::new().await;
    let reference = open_topup_session(&server, 400).await;
    server.gateway.set_charge(GatewayCharge {
        reference: reference.clone(),
        status: ChargeStatus::Success,
        amount: Cents::from_shillings(400),
        gateway_response: Some("Approved".into()),
        paid_at: None,
        raw: json!({}),
    });

    let path = format!("/api/payments/verify/{reference}");
    let (status, _) = server.get_as("user-bob", &path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, payment) = server.get_as("user-alice", &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], json!("success"));
    assert_eq!(mgr_balance(&server).await, Cents::from_shillings(390));
}
