use chama_common::Cents;
use chama_ledger::{
    db_types::{PayoutDetails, PayoutMethod},
    events::EventProducers,
    test_utils::{fund_mgr, new_test_database, seed_chama},
    traits::{LedgerQueries, NewContribution},
    LedgerError,
    LockApi,
    RequestContext,
    TransferApi,
};

mod support;
use support::{count_audit_entries, member};

#[tokio::test]
async fn members_cannot_lock_each_other() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let api = LockApi::new(db.clone(), EventProducers::default());
    let ctx = RequestContext::for_member(&chama.alice);

    let err = api.lock(&ctx, chama.bob.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Authorization(_)));
    let err = api.unlock(&ctx, chama.bob.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::Authorization(_)));
    // Treasurers manage loans, not locks
    let ctx = RequestContext::for_member(&chama.treasurer);
    assert!(matches!(api.lock(&ctx, chama.bob.id).await, Err(LedgerError::Authorization(_))));

    assert!(!member(&db, chama.bob.id).await.withdrawal_locked);
    assert_eq!(count_audit_entries(&db, "lock_withdrawal").await, 0);
}

#[tokio::test]
async fn admin_lock_blocks_withdrawals_until_unlocked() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let bob = fund_mgr(&db, &chama.bob, Cents::from_shillings(500)).await;
    let locks = LockApi::new(db.clone(), EventProducers::default());
    let transfers = TransferApi::new(db.clone(), EventProducers::default());
    let admin = RequestContext::for_member(&chama.admin);
    let ctx = RequestContext::for_member(&bob);
    let amount = Cents::from_shillings(100);
    let internal = PayoutDetails::default();

    let receipt = locks.lock(&admin, bob.id).await.expect("lock");
    assert!(receipt.member.withdrawal_locked);
    assert_eq!(receipt.audit.action, "lock_withdrawal");
    assert_eq!(receipt.audit.target_member_id, Some(bob.id));
    assert!(receipt.notification.is_none());

    let err = transfers.withdraw(&ctx, amount, PayoutMethod::Internal, &internal).await.unwrap_err();
    assert!(matches!(err, LedgerError::Locked));
    assert_eq!(member(&db, bob.id).await.mgr_balance, Cents::from_shillings(500));

    // Locked members can still receive and save
    let contribution =
        NewContribution { amount, payment_method: "cash".into(), reference: None, notes: None };
    transfers.record_contribution(&ctx, contribution).await.expect("contribution while locked");

    let receipt = locks.unlock(&admin, bob.id).await.expect("unlock");
    assert!(!receipt.member.withdrawal_locked);
    assert_eq!(receipt.audit.action, "unlock_withdrawal");
    let notification = receipt.notification.expect("no notification");
    assert_eq!(notification.notification_type, "withdrawal_unlocked");
    assert_eq!(notification.user_id, "user-bob");

    let receipt = transfers.withdraw(&ctx, amount, PayoutMethod::Internal, &internal).await.expect("withdraw");
    assert_eq!(receipt.member.mgr_balance, Cents::from_shillings(400));
}

#[tokio::test]
async fn locking_twice_is_an_invalid_state() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let api = LockApi::new(db.clone(), EventProducers::default());
    let admin = RequestContext::for_member(&chama.admin);

    api.lock(&admin, chama.alice.id).await.expect("lock");
    assert!(matches!(api.lock(&admin, chama.alice.id).await, Err(LedgerError::InvalidState(_))));
    api.unlock(&admin, chama.alice.id).await.expect("unlock");
    assert!(matches!(api.unlock(&admin, chama.alice.id).await, Err(LedgerError::InvalidState(_))));
    assert_eq!(count_audit_entries(&db, "lock_withdrawal").await, 1);
    assert_eq!(count_audit_entries(&db, "unlock_withdrawal").await, 1);
}

#[tokio::test]
async fn admins_only_reach_their_own_chama() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let other = seed_chama(&db).await;
    let api = LockApi::new(db.clone(), EventProducers::default());
    let admin = RequestContext::for_member(&chama.admin);

    let err = api.lock(&admin, other.alice.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    assert!(matches!(api.lock(&admin, 4242).await, Err(LedgerError::NotFound(_))));
    assert!(!member(&db, other.alice.id).await.withdrawal_locked);
}

#[tokio::test]
async fn deactivated_members_can_no_longer_transact() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    let alice = fund_mgr(&db, &chama.alice, Cents::from_shillings(100)).await;
    let locks = LockApi::new(db.clone(), EventProducers::default());
    let transfers = TransferApi::new(db.clone(), EventProducers::default());

    let member_ctx = RequestContext::for_member(&chama.bob);
    assert!(matches!(locks.deactivate_member(&member_ctx, alice.id).await, Err(LedgerError::Authorization(_))));

    let admin = RequestContext::for_member(&chama.admin);
    let receipt = locks.deactivate_member(&admin, alice.id).await.expect("deactivate");
    assert!(!receipt.member.is_active);
    assert_eq!(receipt.notification.expect("no notification").notification_type, "membership_deactivated");
    // Balances stay on record
    assert_eq!(receipt.member.mgr_balance, Cents::from_shillings(100));
    assert!(db.fetch_member_for_user("user-alice", chama.chama.id).await.unwrap().is_none());

    let ctx = RequestContext::for_member(&alice);
    let err = transfers.top_up(&ctx, Cents::from(1)).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
    let bob = fund_mgr(&db, &chama.bob, Cents::from_shillings(10)).await;
    let ctx = RequestContext::for_member(&bob);
    let err = transfers.send(&ctx, alice.id, Cents::from(100), None, &PayoutDetails::default()).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}
