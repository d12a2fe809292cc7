use actix_web::http::StatusCode;
use chama_common::Cents;
use chama_ledger::test_utils::{fund_mgr, fund_savings};
use serde_json::json;

use super::helpers::TestServer;

#[actix_web::test]
async fn top_up_moves_savings_into_the_mgr_wallet() {
    let server = TestServer::new().await;
    fund_savings(&server.db, &server.seed.alice, Cents::from_shillings(1000)).await;
    let body = json!({ "operation": "topup", "chamaId": server.chama_id(), "amount": 400 });
    let (status, body) = server.post_as("user-alice", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["newBalances"]["savingsBalance"], json!(600.0));
    assert_eq!(body["newBalances"]["mgrBalance"], json!(400.0));
}

#[actix_web::test]
async fn withdrawing_more_than_the_balance_is_a_conflict() {
    let server = TestServer::new().await;
    fund_mgr(&server.db, &server.seed.alice, Cents::from_shillings(400)).await;
    let body = json!({
        "operation": "withdraw",
        "chamaId": server.chama_id(),
        "amount": 700,
        "payoutMethod": "mpesa",
        "payoutDetails": { "phoneNumber": "254712345678" }
    });
    let (status, body) = server.post_as("user-alice", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "success": false, "error": "Insufficient MGR wallet balance. Available: KES 400.00" }));
}

#[actix_web::test]
async fn withdrawals_queue_a_payout() {
    let server = TestServer::new().await;
    fund_mgr(&server.db, &server.seed.alice, Cents::from_shillings(400)).await;
    let body = json!({
        "operation": "withdraw",
        "chamaId": server.chama_id(),
        "amount": 150,
        "payoutMethod": "mpesa",
        "payoutDetails": { "phoneNumber": "254712345678" }
    });
    let (status, body) = server.post_as("user-alice", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newBalances"]["mgrBalance"], json!(250.0));
    assert!(body["reference"].is_string());

    let path = format!("/api/members/{}/me/payouts", server.chama_id());
    let (status, payouts) = server.get_as("user-alice", &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payouts.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn unknown_operations_are_bad_requests() {
    let server = TestServer::new().await;
    let body = json!({ "operation": "borrow", "chamaId": server.chama_id(), "amount": 10 });
    let (status, body) = server.post_as("user-alice", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn members_cannot_lock_each_other() {
    let server = TestServer::new().await;
    let body = json!({ "operation": "lock", "chamaId": server.chama_id(), "targetMemberId": server.seed.bob.id });
    let (status, _) = server.post_as("user-alice", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn locked_members_cannot_withdraw() {
    let server = TestServer::new().await;
    fund_mgr(&server.db, &server.seed.bob, Cents::from_shillings(500)).await;
    let body = json!({ "operation": "lock", "chamaId": server.chama_id(), "targetMemberId": server.seed.bob.id });
    let (status, body) = server.post_as("user-admin", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newBalances"]["withdrawalLocked"], json!(true));

    let body =
        json!({ "operation": "withdraw", "chamaId": server.chama_id(), "amount": 100, "payoutMethod": "internal" });
    let (status, body) = server.post_as("user-bob", "/api/wallet", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[actix_web::test]
async fn cash_contributions_are_credited_to_savings() {
    let server = TestServer::new().await;
    let body = json!({ "chamaId": server.chama_id(), "amount": 1500, "paymentMethod": "cash", "notes": "March" });
    let (status, body) = server.post_as("user-alice", "/api/contributions", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newBalances"]["savingsBalance"], json!(1500.0));

    let path = format!("/api/members/{}/me", server.chama_id());
    let (status, overview) = server.get_as("user-alice", &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["member"]["total_contributed"], json!(1500.0));
}

#[actix_web::test]
async fn only_officers_disburse_loans() {
    let server = TestServer::new().await;
    let body = json!({ "chamaId": server.chama_id(), "loanId": 999, "amount": 5000 });
    let (status, _) = server.post_as("user-alice", "/api/loans/disburse", body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.post_as("user-treasurer", "/api/loans/disburse", body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deactivated_members_lose_access() {
    let server = TestServer::new().await;
    let path = format!("/api/members/{}/{}/deactivate", server.chama_id(), server.seed.bob.id);
    let (status, _) = server.post_as("user-alice", &path, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.post_as("user-admin", &path, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, _) = server.get_as("user-bob", &format!("/api/members/{}/me", server.chama_id())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
