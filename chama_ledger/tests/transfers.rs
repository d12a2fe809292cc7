use chama_common::Cents;
use chama_ledger::{
    db_types::{PayoutDetails, PayoutMethod, PayoutStatus},
    events::EventProducers,
    test_utils::{fund_mgr, fund_savings, new_test_database, seed_chama},
    traits::{LedgerQueries, NewContribution},
    LedgerError,
    RequestContext,
    TransferApi,
};

mod support;
use support::{count_audit_entries, member};

fn kes(shillings: i64) -> Cents {
    Cents::from_shillings(shillings)
}

#[tokio::test]
async fn top_up_moves_savings_into_mgr_wallet() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_savings(&db, &chama.alice, kes(1000)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);

    let receipt = api.top_up(&ctx, kes(400)).await.expect("top up failed");
    assert_eq!(receipt.member.savings_balance, kes(600));
    assert_eq!(receipt.member.mgr_balance, kes(400));
    assert_eq!(receipt.audit.action, "topup_mgr_wallet");
    assert_eq!(receipt.audit.amount, kes(400));
    assert_eq!(receipt.audit.details.0["previous_savings"], 1000.0);
    assert_eq!(receipt.audit.details.0["new_mgr"], 400.0);
    // Top-ups only affect the caller
    assert!(receipt.notification.is_none());
}

#[tokio::test]
async fn top_up_is_rejected_without_enough_savings() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_savings(&db, &chama.alice, kes(100)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);

    let err = api.top_up(&ctx, kes(101)).await.unwrap_err();
    match err {
        LedgerError::InsufficientBalance { available, .. } => assert_eq!(available, kes(100)),
        e => panic!("Unexpected error: {e}"),
    }
    assert!(matches!(api.top_up(&ctx, Cents::ZERO).await, Err(LedgerError::Validation(_))));
    assert!(matches!(api.top_up(&ctx, kes(-5)).await, Err(LedgerError::Validation(_))));
    let alice = member(&db, alice.id).await;
    assert_eq!(alice.savings_balance, kes(100));
    assert_eq!(alice.mgr_balance, Cents::ZERO);
    assert_eq!(count_audit_entries(&db, "topup_mgr_wallet").await, 0);
}

#[tokio::test]
async fn internal_withdrawal_credits_user_wallet() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, kes(500)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);

    let receipt =
        api.withdraw(&ctx, kes(200), PayoutMethod::Internal, &PayoutDetails::default()).await.expect("withdraw");
    let reference = receipt.reference.clone().expect("no reference");
    assert!(reference.starts_with("WD-"));
    assert_eq!(receipt.member.mgr_balance, kes(300));
    let payout = receipt.payout.expect("no payout");
    assert_eq!(payout.status, PayoutStatus::Completed);
    assert_eq!(receipt.user_wallet.expect("no user wallet").balance, kes(200));
    let wallet = db.fetch_user_wallet("user-alice").await.unwrap().unwrap();
    assert_eq!(wallet.balance, kes(200));
}

#[tokio::test]
async fn mobile_money_withdrawal_creates_pending_payout() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, kes(500)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);

    let details = PayoutDetails::phone("0712345678");
    let receipt = api.withdraw(&ctx, kes(250), PayoutMethod::Mpesa, &details).await.expect("withdraw");
    assert_eq!(receipt.member.mgr_balance, kes(250));
    let payout = receipt.payout.expect("no payout");
    assert_eq!(payout.status, PayoutStatus::Pending);
    assert_eq!(payout.details.0, details);
    assert!(db.fetch_user_wallet("user-alice").await.unwrap().is_none());

    // A phone number is required
    let err = api.withdraw(&ctx, kes(10), PayoutMethod::Airtel, &PayoutDetails::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn withdrawal_over_balance_changes_nothing() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, kes(300)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);

    let err = api.withdraw(&ctx, kes(301), PayoutMethod::Internal, &PayoutDetails::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { available, .. } if available == kes(300)));
    assert_eq!(err.to_string(), "Insufficient MGR wallet balance. Available: KES 300.00");
    let alice = member(&db, alice.id).await;
    assert_eq!(alice.mgr_balance, kes(300));
    assert!(db.fetch_payouts_for_member(alice.id).await.unwrap().is_empty());
    assert_eq!(count_audit_entries(&db, "withdraw_mgr_wallet").await, 0);
}

#[tokio::test]
async fn send_conserves_the_total() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, kes(800)).await;
    let bob = fund_mgr(&db, &chama.bob, kes(50)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());

    let ctx = RequestContext::for_member(&alice);
    let receipt = api.send(&ctx, bob.id, kes(300), None, &PayoutDetails::default()).await.expect("send");
    assert_eq!(receipt.member.mgr_balance, kes(500));
    let recipient = receipt.counterparty.expect("no recipient");
    assert_eq!(recipient.mgr_balance, kes(350));
    assert_eq!(receipt.member.mgr_balance + recipient.mgr_balance, kes(850));
    assert_eq!(receipt.audit.target_member_id, Some(bob.id));
    let notification = receipt.notification.expect("no notification");
    assert_eq!(notification.notification_type, "funds_received");
    assert_eq!(notification.user_id, "user-bob");

    // Sending the other way round touches the rows in the opposite order
    let ctx = RequestContext::for_member(&bob);
    let receipt = api.send(&ctx, alice.id, kes(350), None, &PayoutDetails::default()).await.expect("send back");
    assert_eq!(receipt.member.mgr_balance, Cents::ZERO);
    assert_eq!(receipt.counterparty.unwrap().mgr_balance, kes(850));
}

#[tokio::test]
async fn send_rejects_bad_recipients() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let other = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, kes(100)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&alice);
    let none = PayoutDetails::default();

    let err = api.send(&ctx, alice.id, kes(10), None, &none).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = api.send(&ctx, other.bob.id, kes(10), None, &none).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    let err = api.send(&ctx, 9999, kes(10), None, &none).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    let err = api.send(&ctx, chama.bob.id, kes(101), None, &none).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(member(&db, alice.id).await.mgr_balance, kes(100));
    assert_eq!(member(&db, other.bob.id).await.mgr_balance, Cents::ZERO);
}

#[tokio::test]
async fn contributions_credit_savings_and_total() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&chama.alice);
    let contribution = NewContribution {
        amount: kes(1500),
        payment_method: "mpesa".into(),
        reference: Some("QFT7H2K9LM".into()),
        notes: Some("October".into()),
    };
    let receipt = api.record_contribution(&ctx, contribution.clone()).await.expect("contribution");
    assert_eq!(receipt.member.savings_balance, kes(1500));
    assert_eq!(receipt.member.total_contributed, kes(1500));
    assert_eq!(receipt.audit.action, "make_contribution");
    let history = db.fetch_contributions_for_member(chama.alice.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reference.as_deref(), Some("QFT7H2K9LM"));

    // The same external reference cannot be recorded twice
    let err = api.record_contribution(&ctx, contribution).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(member(&db, chama.alice.id).await.savings_balance, kes(1500));
}
