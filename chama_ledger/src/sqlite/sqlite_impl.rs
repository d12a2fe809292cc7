//! `SqliteDatabase` is a concrete implementation of a chama ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the backend traits defined in the [`traits`]
//! module.
//!
//! Every balance-affecting method follows the same shape: open a transaction, issue the guarded `UPDATE` that
//! claims the row (and with it SQLite's write lock), then write the counter-entries, the audit entry and any
//! notification, then commit. When the guard matches no row, the transaction is rolled back and the current state is
//! read back to explain why.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chama_common::Cents;
use log::*;
use serde_json::{json, Value};
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{
    audit,
    chamas,
    contributions,
    db_url,
    loans,
    members,
    new_pool,
    notifications,
    payments,
    payouts,
    wallets,
};
use crate::{
    db_types::{
        AuditEntry,
        Bucket,
        CentralWallet,
        Chama,
        Contribution,
        Loan,
        Member,
        NewAuditEntry,
        NewLoan,
        NewMember,
        NewNotification,
        NewPaymentTransaction,
        Notification,
        PaymentPurpose,
        PaymentTransaction,
        Payout,
        PayoutDetails,
        PayoutMethod,
        PayoutStatus,
        UserWallet,
    },
    helpers::new_withdrawal_reference,
    ledger_api::RequestContext,
    traits::{
        ChamaManagement,
        ChargeFailure,
        ChargeSettlement,
        LedgerDatabase,
        LedgerError,
        LedgerQueries,
        LoanReceipt,
        NewContribution,
        PaymentDatabase,
        PayoutReceipt,
        SettlementReceipt,
        TransferReceipt,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `CHAMA_DATABASE_URL` or the default location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Explains why a guarded debit of the given member's bucket matched no row.
    async fn member_debit_error(
        &self,
        member_id: i64,
        chama_id: i64,
        bucket: Bucket,
        respect_lock: bool,
    ) -> LedgerError {
        let mut conn = match self.pool.acquire().await {
            Ok(c) => c,
            Err(e) => return e.into(),
        };
        match members::fetch_member(member_id, &mut conn).await {
            Err(e) => e.into(),
            Ok(Some(m)) if m.chama_id == chama_id && m.is_active => {
                if respect_lock && m.withdrawal_locked {
                    return LedgerError::Locked;
                }
                let available = match bucket {
                    Bucket::Savings => m.savings_balance,
                    _ => m.mgr_balance,
                };
                LedgerError::InsufficientBalance { bucket, available }
            },
            Ok(_) => not_a_member(member_id, chama_id),
        }
    }

    async fn loan_state_error(&self, loan_id: i64, chama_id: i64, expected: &str) -> LedgerError {
        let mut conn = match self.pool.acquire().await {
            Ok(c) => c,
            Err(e) => return e.into(),
        };
        match loans::fetch_loan(loan_id, &mut conn).await {
            Err(e) => e.into(),
            Ok(Some(loan)) if loan.chama_id == chama_id => {
                LedgerError::InvalidState(format!("Loan #{loan_id} is {}, but it must be {expected}", loan.status))
            },
            Ok(_) => LedgerError::NotFound(format!("Loan #{loan_id} not found")),
        }
    }

    /// Explains why a guarded status change on a payment matched no row.
    async fn payment_state_error(&self, reference: &str) -> LedgerError {
        match self.fetch_payment(reference).await {
            Err(e) => e,
            Ok(None) => LedgerError::UnknownReference(reference.to_string()),
            Ok(Some(p)) if p.status.is_final() => LedgerError::DuplicateCallback(reference.to_string()),
            Ok(Some(_)) => LedgerError::InvalidState(format!("Payment {reference} is being processed")),
        }
    }

    async fn payout_state_error(&self, payout_id: i64) -> LedgerError {
        let mut conn = match self.pool.acquire().await {
            Ok(c) => c,
            Err(e) => return e.into(),
        };
        match payouts::fetch_payout(payout_id, &mut conn).await {
            Err(e) => e.into(),
            Ok(None) => LedgerError::NotFound(format!("Payout #{payout_id} not found")),
            Ok(Some(p)) => LedgerError::InvalidState(format!("Payout {} is already {}", p.reference, p.status)),
        }
    }
}

fn not_a_member(member_id: i64, chama_id: i64) -> LedgerError {
    LedgerError::NotFound(format!("Member #{member_id} is not an active member of chama #{chama_id}"))
}

fn unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// An audit entry for an action taken by the caller.
fn entry(ctx: &RequestContext, action: &str, amount: Cents) -> NewAuditEntry {
    NewAuditEntry::new(action, amount).in_chama(Some(ctx.chama_id)).actor(Some(ctx.member_id))
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn top_up(&self, ctx: &RequestContext, amount: Cents) -> Result<TransferReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(member) = members::move_savings_to_mgr(ctx.member_id, ctx.chama_id, amount, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.member_debit_error(ctx.member_id, ctx.chama_id, Bucket::Savings, false).await);
        };
        let details = json!({
            "from": "savings_balance",
            "to": "mgr_balance",
            "previous_savings": (member.savings_balance + amount).to_major_units(),
            "previous_mgr": (member.mgr_balance - amount).to_major_units(),
            "new_savings": member.savings_balance.to_major_units(),
            "new_mgr": member.mgr_balance.to_major_units(),
        });
        let audit =
            audit::insert_audit_entry(entry(ctx, "topup_mgr_wallet", amount).details(details), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Member #{} moved {amount} from savings to their MGR wallet", member.id);
        Ok(TransferReceipt::new(member, audit))
    }

    async fn withdraw(
        &self,
        ctx: &RequestContext,
        amount: Cents,
        method: PayoutMethod,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(member) = members::debit_mgr(ctx.member_id, ctx.chama_id, amount, true, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.member_debit_error(ctx.member_id, ctx.chama_id, Bucket::Mgr, true).await);
        };
        let reference = new_withdrawal_reference();
        let (status, user_wallet) = match method {
            PayoutMethod::Internal => {
                let wallet = wallets::credit_user_wallet(&member.user_id, amount, &mut tx).await?;
                (PayoutStatus::Completed, Some(wallet))
            },
            _ => (PayoutStatus::Pending, None),
        };
        let payout = payouts::insert_payout(&reference, &member, amount, method, details, status, &mut tx).await?;
        let audit_details = json!({
            "method": method,
            "status": status,
            "reference": reference,
            "payout_details": details,
            "previous_mgr": (member.mgr_balance + amount).to_major_units(),
            "new_mgr": member.mgr_balance.to_major_units(),
        });
        let audit =
            audit::insert_audit_entry(entry(ctx, "withdraw_mgr_wallet", amount).details(audit_details), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Member #{} withdrew {amount} via {method}. Payout {reference} is {status}", member.id);
        let mut receipt = TransferReceipt::new(member, audit);
        receipt.reference = Some(reference);
        receipt.payout = Some(payout);
        receipt.user_wallet = user_wallet;
        Ok(receipt)
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        recipient_member_id: i64,
        amount: Cents,
        method: Option<PayoutMethod>,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError> {
        if recipient_member_id == ctx.member_id {
            return Err(LedgerError::Validation("You cannot send funds to yourself".into()));
        }
        let mut tx = self.pool.begin().await?;
        let mut sender = None;
        let mut recipient = None;
        // Rows are always touched in ascending id order
        let sender_first = [true, false];
        let order = if ctx.member_id < recipient_member_id { sender_first } else { [false, true] };
        for is_sender in order {
            if is_sender {
                sender = members::debit_mgr(ctx.member_id, ctx.chama_id, amount, false, &mut tx).await?;
                if sender.is_none() {
                    tx.rollback().await?;
                    return Err(self.member_debit_error(ctx.member_id, ctx.chama_id, Bucket::Mgr, false).await);
                }
            } else {
                recipient = members::credit_mgr(recipient_member_id, ctx.chama_id, amount, true, &mut tx).await?;
                if recipient.is_none() {
                    tx.rollback().await?;
                    return Err(LedgerError::NotFound("Recipient not found".into()));
                }
            }
        }
        let (Some(sender), Some(recipient)) = (sender, recipient) else {
            return Err(LedgerError::InvalidState("Transfer did not reach both members".into()));
        };
        let audit_details = json!({
            "method": method,
            "payout_details": details,
            "sender_previous_mgr": (sender.mgr_balance + amount).to_major_units(),
            "sender_new_mgr": sender.mgr_balance.to_major_units(),
            "recipient_previous_mgr": (recipient.mgr_balance - amount).to_major_units(),
            "recipient_new_mgr": recipient.mgr_balance.to_major_units(),
        });
        let audit = audit::insert_audit_entry(
            entry(ctx, "send_funds", amount).target(recipient.id).details(audit_details),
            &mut tx,
        )
        .await?;
        let notification = NewNotification::for_member(
            &recipient,
            "funds_received",
            "Funds Received",
            format!("You received {amount} in your MGR wallet from {}", sender.name()),
        )
        .with_metadata(json!({ "amount": amount.to_major_units(), "sender_id": sender.id }));
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Member #{} sent {amount} to member #{}", sender.id, recipient.id);
        let mut receipt = TransferReceipt::new(sender, audit);
        receipt.counterparty = Some(recipient);
        receipt.notification = Some(notification);
        Ok(receipt)
    }

    async fn record_contribution(
        &self,
        ctx: &RequestContext,
        contribution: NewContribution,
    ) -> Result<TransferReceipt, LedgerError> {
        let NewContribution { amount, payment_method, reference, notes } = contribution;
        let mut tx = self.pool.begin().await?;
        let Some(member) = members::credit_savings(ctx.member_id, ctx.chama_id, amount, &mut tx).await? else {
            tx.rollback().await?;
            return Err(not_a_member(ctx.member_id, ctx.chama_id));
        };
        let record = contributions::insert_contribution(
            member.id,
            member.chama_id,
            amount,
            &payment_method,
            reference.as_deref(),
            notes.as_deref(),
            &mut tx,
        )
        .await;
        let record = match record {
            Ok(r) => r,
            Err(e) if unique_violation(&e) => {
                tx.rollback().await?;
                let reference = reference.unwrap_or_default();
                return Err(LedgerError::InvalidState(format!("Contribution {reference} has already been recorded")));
            },
            Err(e) => return Err(e.into()),
        };
        let details = json!({
            "contribution_id": record.id,
            "payment_method": payment_method,
            "reference": reference,
            "notes": notes,
            "previous_savings": (member.savings_balance - amount).to_major_units(),
            "new_savings": member.savings_balance.to_major_units(),
            "total_contributed": member.total_contributed.to_major_units(),
        });
        let audit = audit::insert_audit_entry(entry(ctx, "make_contribution", amount).details(details), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Contribution of {amount} recorded for member #{}", member.id);
        let mut receipt = TransferReceipt::new(member, audit);
        receipt.reference = reference;
        Ok(receipt)
    }

    async fn set_withdrawal_lock(
        &self,
        ctx: &RequestContext,
        target_member_id: i64,
        locked: bool,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(target) = members::set_withdrawal_lock(target_member_id, ctx.chama_id, locked, &mut tx).await?
        else {
            tx.rollback().await?;
            let existing = self.fetch_member(target_member_id).await?;
            return Err(match existing {
                Some(m) if m.chama_id == ctx.chama_id => {
                    let state = if locked { "locked" } else { "unlocked" };
                    LedgerError::InvalidState(format!("Withdrawals for member #{target_member_id} are already {state}"))
                },
                _ => LedgerError::NotFound(format!("Member #{target_member_id} not found in this chama")),
            });
        };
        let (action, details) = if locked {
            ("lock_withdrawal", json!({ "locked_by": ctx.user_id }))
        } else {
            ("unlock_withdrawal", json!({ "unlocked_by": ctx.user_id }))
        };
        let audit = audit::insert_audit_entry(
            entry(ctx, action, Cents::ZERO).target(target.id).details(details),
            &mut tx,
        )
        .await?;
        let notification = if locked {
            None
        } else {
            let n = NewNotification::for_member(
                &target,
                "withdrawal_unlocked",
                "Withdrawal Unlocked",
                "Your MGR wallet has been unlocked for withdrawal",
            )
            .with_metadata(json!({ "unlocked_by": ctx.member_id }));
            Some(notifications::insert_notification(n, &mut tx).await?)
        };
        tx.commit().await?;
        debug!("🗃️ Withdrawal lock for member #{} set to {locked} by member #{}", target.id, ctx.member_id);
        let mut receipt = TransferReceipt::new(target, audit);
        receipt.notification = notification;
        Ok(receipt)
    }

    async fn deactivate_member(&self, ctx: &RequestContext, member_id: i64) -> Result<TransferReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(member) = members::deactivate_member(member_id, ctx.chama_id, &mut tx).await? else {
            tx.rollback().await?;
            return Err(not_a_member(member_id, ctx.chama_id));
        };
        let details = json!({
            "savings_balance": member.savings_balance.to_major_units(),
            "mgr_balance": member.mgr_balance.to_major_units(),
        });
        let audit = audit::insert_audit_entry(
            entry(ctx, "deactivate_member", Cents::ZERO).target(member.id).details(details),
            &mut tx,
        )
        .await?;
        let notification = if member.id == ctx.member_id {
            None
        } else {
            let n = NewNotification::for_member(
                &member,
                "membership_deactivated",
                "Membership Deactivated",
                "Your membership in this chama has been deactivated",
            );
            Some(notifications::insert_notification(n, &mut tx).await?)
        };
        tx.commit().await?;
        info!("🗃️ Member #{member_id} deactivated by member #{}", ctx.member_id);
        let mut receipt = TransferReceipt::new(member, audit);
        receipt.notification = notification;
        Ok(receipt)
    }

    async fn approve_loan(&self, ctx: &RequestContext, loan_id: i64) -> Result<LoanReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(loan) = loans::approve_loan(loan_id, ctx.chama_id, ctx.member_id, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.loan_state_error(loan_id, ctx.chama_id, "pending").await);
        };
        let borrower = members::fetch_member(loan.borrower_member_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Borrower #{} not found", loan.borrower_member_id)))?;
        let audit = audit::insert_audit_entry(
            entry(ctx, "approve_loan", loan.amount).target(borrower.id).details(json!({ "loan_id": loan.id })),
            &mut tx,
        )
        .await?;
        let notification = NewNotification::for_member(
            &borrower,
            "loan_approved",
            "Loan Approved",
            format!("Your loan of {} has been approved", loan.amount),
        )
        .with_metadata(json!({ "loan_id": loan.id, "approved_by": ctx.member_id }));
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Loan #{loan_id} approved by member #{}", ctx.member_id);
        Ok(LoanReceipt {
            loan,
            borrower,
            central_wallet: None,
            disbursement: None,
            audit,
            notification: Some(notification),
        })
    }

    async fn disburse_loan_funds(
        &self,
        ctx: &RequestContext,
        loan_id: i64,
        amount: Cents,
        destination: &str,
    ) -> Result<LoanReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(loan) = loans::activate_loan(loan_id, ctx.chama_id, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.loan_state_error(loan_id, ctx.chama_id, "approved").await);
        };
        if amount != loan.amount {
            tx.rollback().await?;
            return Err(LedgerError::Validation(format!(
                "Disbursement of {amount} does not match the approved loan amount of {}",
                loan.amount
            )));
        }
        let Some(central) = wallets::debit_central_wallet(ctx.chama_id, amount, &mut tx).await? else {
            tx.rollback().await?;
            let available = self.fetch_central_wallet(ctx.chama_id).await?.map(|w| w.balance).unwrap_or_default();
            return Err(LedgerError::InsufficientBalance { bucket: Bucket::Central, available });
        };
        let Some(borrower) = members::credit_mgr(loan.borrower_member_id, ctx.chama_id, amount, true, &mut tx).await?
        else {
            tx.rollback().await?;
            return Err(not_a_member(loan.borrower_member_id, ctx.chama_id));
        };
        let disbursement = loans::insert_disbursement(&loan, amount, destination, ctx.member_id, &mut tx).await?;
        let details = json!({
            "loan_id": loan.id,
            "disbursement_id": disbursement.id,
            "destination": destination,
            "previous_central": (central.balance + amount).to_major_units(),
            "new_central": central.balance.to_major_units(),
            "previous_mgr": (borrower.mgr_balance - amount).to_major_units(),
            "new_mgr": borrower.mgr_balance.to_major_units(),
        });
        let audit = audit::insert_audit_entry(
            entry(ctx, "send_loan_funds", amount).target(borrower.id).details(details),
            &mut tx,
        )
        .await?;
        let notification = NewNotification::for_member(
            &borrower,
            "loan_funds_sent",
            "Loan Funds Sent",
            format!("{amount} from your approved loan has been sent to your MGR wallet"),
        )
        .with_metadata(json!({ "loan_id": loan.id, "amount": amount.to_major_units() }));
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Loan #{loan_id}: {amount} sent from the central wallet of chama #{} to member #{}",
            ctx.chama_id, borrower.id
        );
        Ok(LoanReceipt {
            loan,
            borrower,
            central_wallet: Some(central),
            disbursement: Some(disbursement),
            audit,
            notification: Some(notification),
        })
    }
}

/// Credits the net amount of a settled charge to the bucket implied by its purpose. Returns a description of the
/// balance change for the audit log.
async fn credit_for_purpose(
    payment: &PaymentTransaction,
    net: Cents,
    conn: &mut SqliteConnection,
) -> Result<Value, LedgerError> {
    let missing = |what: &str| {
        LedgerError::InvalidState(format!("Payment {} ({}) has no {what}", payment.reference, payment.purpose))
    };
    let chama_id = payment.chama_id.ok_or_else(|| missing("chama"));
    match payment.purpose {
        PaymentPurpose::Contribution => {
            let member_id = payment.member_id.ok_or_else(|| missing("member"))?;
            let chama_id = chama_id?;
            let member = members::credit_savings(member_id, chama_id, net, conn)
                .await?
                .ok_or_else(|| not_a_member(member_id, chama_id))?;
            let reference = Some(payment.reference.as_str());
            let record =
                contributions::insert_contribution(member_id, chama_id, net, "paystack", reference, None, conn).await?;
            Ok(json!({
                "member_id": member_id,
                "contribution_id": record.id,
                "new_savings": member.savings_balance.to_major_units(),
                "total_contributed": member.total_contributed.to_major_units(),
            }))
        },
        PaymentPurpose::WalletTopup => {
            let member_id = payment.member_id.ok_or_else(|| missing("member"))?;
            let chama_id = chama_id?;
            let member = members::credit_mgr(member_id, chama_id, net, true, conn)
                .await?
                .ok_or_else(|| not_a_member(member_id, chama_id))?;
            Ok(json!({ "member_id": member_id, "new_mgr": member.mgr_balance.to_major_units() }))
        },
        PaymentPurpose::LoanRepayment => {
            let loan_id = payment.loan_id.ok_or_else(|| missing("loan"))?;
            let chama_id = chama_id?;
            let loan = loans::apply_repayment(loan_id, chama_id, net, conn).await?.ok_or_else(|| {
                LedgerError::InvalidState(format!("Loan #{loan_id} is not an active loan of chama #{chama_id}"))
            })?;
            let central = wallets::credit_central_wallet(chama_id, net, conn)
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("Chama #{chama_id} has no central wallet")))?;
            Ok(json!({
                "loan_id": loan_id,
                "amount_repaid": loan.amount_repaid.to_major_units(),
                "loan_status": loan.status,
                "new_central": central.balance.to_major_units(),
            }))
        },
        PaymentPurpose::Registration => {
            let chama_id = chama_id?;
            let central = wallets::credit_central_wallet(chama_id, net, conn)
                .await?
                .ok_or_else(|| LedgerError::NotFound(format!("Chama #{chama_id} has no central wallet")))?;
            Ok(json!({ "new_central": central.balance.to_major_units() }))
        },
        PaymentPurpose::Other => {
            let wallet = wallets::credit_user_wallet(&payment.user_id, net, conn).await?;
            Ok(json!({ "user_id": payment.user_id, "new_user_wallet": wallet.balance.to_major_units() }))
        },
    }
}

impl PaymentDatabase for SqliteDatabase {
    async fn insert_pending_payment(&self, payment: NewPaymentTransaction) -> Result<PaymentTransaction, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let reference = payment.reference.clone();
        match payments::insert_payment(payment, &mut conn).await {
            Ok(p) => {
                debug!("🗃️ Payment {reference} of {} saved as pending", p.amount);
                Ok(p)
            },
            Err(e) if unique_violation(&e) => {
                Err(LedgerError::InvalidState(format!("Payment reference {reference} already exists")))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn attach_gateway_session(
        &self,
        reference: &str,
        access_code: &str,
        authorization_url: &str,
    ) -> Result<PaymentTransaction, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        match payments::attach_session(reference, access_code, authorization_url, &mut conn).await? {
            Some(p) => Ok(p),
            None => Err(self.payment_state_error(reference).await),
        }
    }

    async fn fetch_payment(&self, reference: &str) -> Result<Option<PaymentTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment_by_reference(reference, &mut conn).await?)
    }

    async fn settle_payment(&self, settlement: ChargeSettlement) -> Result<SettlementReceipt, LedgerError> {
        let ChargeSettlement { reference, gateway_amount, gateway_response, paid_at, payload, fee_bps } = settlement;
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::claim_pending_payment(&reference, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.payment_state_error(&reference).await);
        };
        if gateway_amount < payment.amount {
            tx.rollback().await?;
            return Err(LedgerError::InvalidState(format!(
                "The gateway reported {gateway_amount} for payment {reference}, but {} is due. The payment is left \
                 pending for manual reconciliation.",
                payment.amount
            )));
        }
        if gateway_amount > payment.amount {
            warn!(
                "🗃️ The gateway reported {gateway_amount} for payment {reference}, which is more than the {} due. Only {} \
                 will be credited.",
                payment.amount, payment.amount
            );
        }
        let fee = payment.amount.basis_points(fee_bps);
        let net = payment.amount - fee;
        let bucket = payment.purpose.credited_bucket();
        let credit = credit_for_purpose(&payment, net, &mut tx).await?;
        let payment = payments::mark_payment_successful(
            payment.id,
            fee,
            net,
            gateway_response.as_deref(),
            paid_at.as_deref(),
            &payload,
            &mut tx,
        )
        .await?;
        payments::insert_platform_fee(&payment, fee, fee_bps, &mut tx).await?;
        let details = json!({
            "reference": reference,
            "purpose": payment.purpose,
            "bucket": bucket,
            "gross": payment.amount.to_major_units(),
            "fee": fee.to_major_units(),
            "net": net.to_major_units(),
            "credit": credit,
        });
        let audit_entry = NewAuditEntry::new("payment_received", net)
            .in_chama(payment.chama_id)
            .actor(payment.member_id)
            .details(details);
        let audit = audit::insert_audit_entry(audit_entry, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment {reference} settled. {net} credited to the {bucket}, {fee} platform fee");
        Ok(SettlementReceipt { payment, fee, net, bucket, audit })
    }

    async fn fail_payment(&self, failure: ChargeFailure) -> Result<PaymentTransaction, LedgerError> {
        let ChargeFailure { reference, gateway_response, payload } = failure;
        let mut tx = self.pool.begin().await?;
        let Some(payment) =
            payments::mark_payment_failed(&reference, &gateway_response, payload.as_deref(), &mut tx).await?
        else {
            tx.rollback().await?;
            return Err(self.payment_state_error(&reference).await);
        };
        let audit_entry = NewAuditEntry::new("payment_failed", payment.amount)
            .in_chama(payment.chama_id)
            .actor(payment.member_id)
            .details(json!({ "reference": reference, "purpose": payment.purpose, "reason": gateway_response }));
        audit::insert_audit_entry(audit_entry, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment {reference} marked as failed: {gateway_response}");
        Ok(payment)
    }

    async fn fetch_pending_payouts(&self, limit: i64) -> Result<Vec<Payout>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_pending_external_payouts(limit, &mut conn).await?)
    }

    async fn fetch_payout(&self, reference: &str) -> Result<Option<Payout>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_payout_by_reference(reference, &mut conn).await?)
    }

    async fn complete_payout(&self, payout_id: i64, transfer_code: &str) -> Result<Payout, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(payout) = payouts::complete_payout(payout_id, transfer_code, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.payout_state_error(payout_id).await);
        };
        let audit_entry = NewAuditEntry::new("payout_completed", payout.amount)
            .in_chama(Some(payout.chama_id))
            .target(payout.member_id)
            .details(json!({ "reference": payout.reference, "method": payout.method, "transfer_code": transfer_code }));
        audit::insert_audit_entry(audit_entry, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payout {} completed with transfer code {transfer_code}", payout.reference);
        Ok(payout)
    }

    async fn fail_payout(&self, payout_id: i64, reason: &str) -> Result<PayoutReceipt, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(payout) = payouts::fail_payout(payout_id, reason, &mut tx).await? else {
            tx.rollback().await?;
            return Err(self.payout_state_error(payout_id).await);
        };
        let member = members::credit_mgr(payout.member_id, payout.chama_id, payout.amount, false, &mut tx)
            .await?
            .ok_or_else(|| not_a_member(payout.member_id, payout.chama_id))?;
        let details = json!({
            "reference": payout.reference,
            "method": payout.method,
            "reason": reason,
            "previous_mgr": (member.mgr_balance - payout.amount).to_major_units(),
            "new_mgr": member.mgr_balance.to_major_units(),
        });
        let audit_entry = NewAuditEntry::new("payout_refund", payout.amount)
            .in_chama(Some(payout.chama_id))
            .target(member.id)
            .details(details);
        let audit = audit::insert_audit_entry(audit_entry, &mut tx).await?;
        let notification = NewNotification::for_member(
            &member,
            "withdrawal_failed",
            "Withdrawal Failed",
            format!(
                "Your withdrawal of {} via {} could not be completed. The amount has been returned to your MGR wallet.",
                payout.amount, payout.method
            ),
        )
        .with_metadata(json!({ "reference": payout.reference, "reason": reason }));
        let notification = notifications::insert_notification(notification, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payout {} failed ({reason}). {} refunded to member #{}", payout.reference, payout.amount, member.id);
        Ok(PayoutReceipt { payout, member, audit, notification: Some(notification) })
    }
}

impl ChamaManagement for SqliteDatabase {
    async fn create_chama(&self, name: &str) -> Result<Chama, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let chama = chamas::insert_chama(name, &mut tx).await?;
        wallets::insert_central_wallet(chama.id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Chama #{} '{}' created", chama.id, chama.name);
        Ok(chama)
    }

    async fn add_member(&self, member: NewMember) -> Result<Member, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        if chamas::fetch_chama(member.chama_id, &mut conn).await?.is_none() {
            return Err(LedgerError::NotFound(format!("Chama #{} not found", member.chama_id)));
        }
        let user_id = member.user_id.clone();
        let chama_id = member.chama_id;
        match members::insert_member(member, &mut conn).await {
            Ok(m) => {
                debug!("🗃️ User {user_id} joined chama #{chama_id} as member #{} ({})", m.id, m.role);
                Ok(m)
            },
            Err(e) if unique_violation(&e) => {
                Err(LedgerError::InvalidState(format!("User {user_id} is already a member of chama #{chama_id}")))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn create_loan(&self, loan: NewLoan) -> Result<Loan, LedgerError> {
        if !loan.amount.is_positive() {
            return Err(LedgerError::Validation("Loan amount must be greater than zero".into()));
        }
        let mut conn = self.pool.acquire().await?;
        match members::fetch_member(loan.borrower_member_id, &mut conn).await? {
            Some(m) if m.chama_id == loan.chama_id && m.is_active => {},
            _ => return Err(not_a_member(loan.borrower_member_id, loan.chama_id)),
        }
        let loan = loans::insert_loan(loan, &mut conn).await?;
        debug!("🗃️ Loan #{} of {} requested by member #{}", loan.id, loan.amount, loan.borrower_member_id);
        Ok(loan)
    }
}

impl LedgerQueries for SqliteDatabase {
    async fn fetch_chama(&self, chama_id: i64) -> Result<Option<Chama>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(chamas::fetch_chama(chama_id, &mut conn).await?)
    }

    async fn fetch_member(&self, member_id: i64) -> Result<Option<Member>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(members::fetch_member(member_id, &mut conn).await?)
    }

    async fn fetch_member_for_user(&self, user_id: &str, chama_id: i64) -> Result<Option<Member>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(members::fetch_active_member_for_user(user_id, chama_id, &mut conn).await?)
    }

    async fn fetch_members_for_chama(&self, chama_id: i64) -> Result<Vec<Member>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(members::fetch_members_for_chama(chama_id, &mut conn).await?)
    }

    async fn fetch_central_wallet(&self, chama_id: i64) -> Result<Option<CentralWallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::fetch_central_wallet(chama_id, &mut conn).await?)
    }

    async fn fetch_user_wallet(&self, user_id: &str) -> Result<Option<UserWallet>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(wallets::fetch_user_wallet(user_id, &mut conn).await?)
    }

    async fn fetch_loan(&self, loan_id: i64) -> Result<Option<Loan>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(loans::fetch_loan(loan_id, &mut conn).await?)
    }

    async fn fetch_contributions_for_member(&self, member_id: i64) -> Result<Vec<Contribution>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(contributions::fetch_contributions_for_member(member_id, &mut conn).await?)
    }

    async fn fetch_payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentTransaction>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payments_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_payouts_for_member(&self, member_id: i64) -> Result<Vec<Payout>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payouts::fetch_payouts_for_member(member_id, &mut conn).await?)
    }

    async fn fetch_audit_log(&self, chama_id: i64, limit: i64) -> Result<Vec<AuditEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::fetch_audit_log(chama_id, limit, &mut conn).await?)
    }

    async fn fetch_notifications_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(notifications::fetch_notifications_for_user(user_id, limit, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Sum of all platform fees collected so far.
    pub async fn total_platform_fees(&self) -> Result<Cents, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::total_platform_fees(&mut conn).await?)
    }
}
