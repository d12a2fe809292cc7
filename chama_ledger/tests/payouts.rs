use chama_common::Cents;
use chama_ledger::{
    db_types::{PayoutDetails, PayoutMethod, PayoutStatus},
    events::EventProducers,
    test_utils::{fund_mgr, new_test_database, seed_chama, MockGateway},
    traits::{GatewayError, LedgerQueries, PaymentDatabase},
    PayoutApi,
    PayoutRunSummary,
    RequestContext,
    SqliteDatabase,
    TransferApi,
};

mod support;
use support::{count_audit_entries, member};

async fn withdraw_to_mpesa(api: &TransferApi<SqliteDatabase>, ctx: &RequestContext, shillings: i64) -> String {
    let details = PayoutDetails::phone("0712345678");
    let receipt = api.withdraw(ctx, Cents::from_shillings(shillings), PayoutMethod::Mpesa, &details).await.unwrap();
    receipt.reference.expect("no reference")
}

#[tokio::test]
async fn pending_payouts_are_completed() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, Cents::from_shillings(1000)).await;
    let transfers = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);
    let first = withdraw_to_mpesa(&transfers, &ctx, 100).await;
    let second = withdraw_to_mpesa(&transfers, &ctx, 200).await;
    // Internal withdrawals never reach the gateway
    let internal = PayoutDetails::default();
    transfers.withdraw(&ctx, Cents::from_shillings(50), PayoutMethod::Internal, &internal).await.unwrap();

    let gateway = MockGateway::new();
    let api = PayoutApi::new(db.clone(), gateway.clone(), EventProducers::default());
    let summary = api.process_pending_payouts(10).await.expect("payout run");
    assert_eq!(summary, PayoutRunSummary { completed: 2, failed: 0, pending: 0 });

    let sent = gateway.transfers();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].reference, first);
    assert_eq!(sent[0].recipient_name, "Alice");
    assert_eq!(sent[1].amount, Cents::from_shillings(200));
    let payout = db.fetch_payout(&second).await.unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Completed);
    assert_eq!(payout.transfer_code, Some(format!("TRF_{second}")));
    assert_eq!(count_audit_entries(&db, "payout_completed").await, 2);
    assert_eq!(member(&db, alice.id).await.mgr_balance, Cents::from_shillings(650));

    // Nothing left to do
    let summary = api.process_pending_payouts(10).await.expect("payout run");
    assert_eq!(summary, PayoutRunSummary::default());
    assert_eq!(gateway.transfers().len(), 2);
}

#[tokio::test]
async fn rejected_payouts_are_refunded() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let bob = fund_mgr(&db, &chama.bob, Cents::from_shillings(300)).await;
    let transfers = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&bob);
    let reference = withdraw_to_mpesa(&transfers, &ctx, 300).await;
    assert_eq!(member(&db, bob.id).await.mgr_balance, Cents::ZERO);

    let gateway = MockGateway::new();
    gateway.fail_transfers_with(Some(GatewayError::Rejected("Invalid recipient".into())));
    let api = PayoutApi::new(db.clone(), gateway, EventProducers::default());
    let summary = api.process_pending_payouts(10).await.expect("payout run");
    assert_eq!(summary.failed, 1);

    let payout = db.fetch_payout(&reference).await.unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Failed);
    assert!(payout.failure_reason.unwrap().contains("Invalid recipient"));
    assert_eq!(member(&db, bob.id).await.mgr_balance, Cents::from_shillings(300));
    assert_eq!(count_audit_entries(&db, "payout_refund").await, 1);
    let notifications = db.fetch_notifications_for_user("user-bob", 10).await.unwrap();
    assert!(notifications.iter().any(|n| n.notification_type == "withdrawal_failed"));
}

#[tokio::test]
async fn timed_out_payouts_stay_pending() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let bob = fund_mgr(&db, &chama.bob, Cents::from_shillings(300)).await;
    let transfers = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&bob);
    let reference = withdraw_to_mpesa(&transfers, &ctx, 120).await;

    let gateway = MockGateway::new();
    gateway.fail_transfers_with(Some(GatewayError::Timeout("no answer".into())));
    let api = PayoutApi::new(db.clone(), gateway.clone(), EventProducers::default());
    let summary = api.process_pending_payouts(10).await.expect("payout run");
    assert_eq!(summary, PayoutRunSummary { completed: 0, failed: 0, pending: 1 });
    let payout = db.fetch_payout(&reference).await.unwrap().unwrap();
    assert_eq!(payout.status, PayoutStatus::Pending);
    assert_eq!(member(&db, bob.id).await.mgr_balance, Cents::from_shillings(180));

    // The retry uses the same reference
    gateway.fail_transfers_with(None);
    let summary = api.process_pending_payouts(10).await.expect("payout run");
    assert_eq!(summary.completed, 1);
    let sent = gateway.transfers();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|t| t.reference == reference));
}
