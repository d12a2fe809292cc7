use chama_common::Cents;
use chama_ledger::{
    db_types::{LoanStatus, NewLoan},
    events::EventProducers,
    test_utils::{fund_central_wallet, new_test_database, seed_chama},
    traits::{ChamaManagement, LedgerQueries},
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
async fn approved_loans_are_paid_from_the_central_wallet() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    fund_central_wallet(&db, chama.chama.id, kes(5000)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let loan = NewLoan { chama_id: chama.chama.id, borrower_member_id: chama.bob.id, amount: kes(3000) };
    let loan = db.create_loan(loan).await.expect("create loan");
    assert_eq!(loan.status, LoanStatus::Pending);

    let treasurer = RequestContext::for_member(&chama.treasurer);
    let receipt = api.approve_loan(&treasurer, loan.id).await.expect("approve");
    assert_eq!(receipt.loan.status, LoanStatus::Approved);
    assert!(receipt.loan.disbursement_status);
    assert_eq!(receipt.loan.approved_by, Some(chama.treasurer.id));
    assert_eq!(receipt.notification.expect("no notification").notification_type, "loan_approved");

    let receipt = api.disburse_loan_funds(&treasurer, loan.id, kes(3000), "mgr_wallet").await.expect("disburse");
    assert_eq!(receipt.loan.status, LoanStatus::Active);
    assert!(receipt.loan.funds_sent_at.is_some());
    assert_eq!(receipt.central_wallet.expect("no central wallet").balance, kes(2000));
    assert_eq!(receipt.borrower.mgr_balance, kes(3000));
    let disbursement = receipt.disbursement.expect("no disbursement record");
    assert_eq!(disbursement.amount, kes(3000));
    assert_eq!(disbursement.destination, "mgr_wallet");
    assert_eq!(disbursement.disbursed_by, chama.treasurer.id);
    assert_eq!(receipt.notification.expect("no notification").notification_type, "loan_funds_sent");
    assert_eq!(receipt.audit.action, "send_loan_funds");

    // A loan is only disbursed once
    let err = api.disburse_loan_funds(&treasurer, loan.id, kes(3000), "mgr_wallet").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));
    assert_eq!(member(&db, chama.bob.id).await.mgr_balance, kes(3000));
}

#[tokio::test]
async fn ordinary_members_cannot_manage_loans() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    fund_central_wallet(&db, chama.chama.id, kes(5000)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let loan = NewLoan { chama_id: chama.chama.id, borrower_member_id: chama.alice.id, amount: kes(1000) };
    let loan = db.create_loan(loan).await.expect("create loan");

    let alice = RequestContext::for_member(&chama.alice);
    assert!(matches!(api.approve_loan(&alice, loan.id).await, Err(LedgerError::Authorization(_))));
    let err = api.disburse_loan_funds(&alice, loan.id, kes(1000), "mgr_wallet").await.unwrap_err();
    assert!(matches!(err, LedgerError::Authorization(_)));
    assert_eq!(db.fetch_loan(loan.id).await.unwrap().unwrap().status, LoanStatus::Pending);
    assert_eq!(count_audit_entries(&db, "approve_loan").await, 0);
}

#[tokio::test]
async fn disbursement_checks_loan_state_and_funds() {
    let db = new_test_database().await;
    let chama = seed_chama(&db).await;
    fund_central_wallet(&db, chama.chama.id, kes(500)).await;
    let api = TransferApi::new(db.clone(), EventProducers::default());
    let admin = RequestContext::for_member(&chama.admin);
    let loan = NewLoan { chama_id: chama.chama.id, borrower_member_id: chama.alice.id, amount: kes(800) };
    let loan = db.create_loan(loan).await.expect("create loan");

    // Not approved yet
    let err = api.disburse_loan_funds(&admin, loan.id, kes(800), "mgr_wallet").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState(_)));

    api.approve_loan(&admin, loan.id).await.expect("approve");
    assert!(matches!(api.approve_loan(&admin, loan.id).await, Err(LedgerError::InvalidState(_))));
    let err = api.disburse_loan_funds(&admin, loan.id, kes(700), "mgr_wallet").await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    let err = api.disburse_loan_funds(&admin, loan.id, kes(800), "mgr_wallet").await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { available, .. } if available == kes(500)));

    // Nothing moved, and the loan can still be disbursed once the wallet is funded
    let loan_now = db.fetch_loan(loan.id).await.unwrap().unwrap();
    assert_eq!(loan_now.status, LoanStatus::Approved);
    assert_eq!(member(&db, chama.alice.id).await.mgr_balance, Cents::ZERO);
    fund_central_wallet(&db, chama.chama.id, kes(300)).await;
    api.disburse_loan_funds(&admin, loan.id, kes(800), "mgr_wallet").await.expect("disburse");
    let central = db.fetch_central_wallet(chama.chama.id).await.unwrap().unwrap();
    assert_eq!(central.balance, Cents::ZERO);

    // Loans from another chama are invisible
    let other = seed_chama(&db).await;
    let other_admin = RequestContext::for_member(&other.admin);
    assert!(matches!(api.approve_loan(&other_admin, loan.id).await, Err(LedgerError::NotFound(_))));
}
