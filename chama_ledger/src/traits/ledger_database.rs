use chama_common::Cents;
use thiserror::Error;

use crate::{
    db_types::{Bucket, PayoutDetails, PayoutMethod},
    ledger_api::RequestContext,
    traits::{
        data_objects::{LoanReceipt, NewContribution, TransferReceipt},
        GatewayError,
    },
};

/// Errors raised by the ledger. Everything except `DatabaseError` and `Gateway` is raised before anything is
/// written.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authorization(String),
    #[error("Insufficient {bucket} balance. Available: {available}")]
    InsufficientBalance { bucket: Bucket, available: Cents },
    #[error("Withdrawals are locked for this member. Contact the chama chairman or admin.")]
    Locked,
    #[error("{0}")]
    NotFound(String),
    /// No payment carries this reference.
    #[error("Unknown payment reference {0}")]
    UnknownReference(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Payment {0} has already been processed")]
    DuplicateCallback(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<GatewayError> for LedgerError {
    fn from(e: GatewayError) -> Self {
        LedgerError::Gateway(e.to_string())
    }
}

/// The balance-affecting operations of the ledger.
///
/// Callers are expected to have validated amounts and roles already (see [`crate::TransferApi`]); implementations
/// check everything that depends on stored state: membership of the chama, balances, locks and loan status.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Moves `amount` from the caller's savings to their MGR wallet.
    async fn top_up(&self, ctx: &RequestContext, amount: Cents) -> Result<TransferReceipt, LedgerError>;

    /// Debits the caller's MGR wallet. `Internal` payouts credit the caller's personal wallet immediately; any other
    /// method creates a pending payout that is settled with the gateway later.
    async fn withdraw(
        &self,
        ctx: &RequestContext,
        amount: Cents,
        method: PayoutMethod,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError>;

    /// Moves `amount` from the caller's MGR wallet to the recipient's MGR wallet.
    async fn send(
        &self,
        ctx: &RequestContext,
        recipient_member_id: i64,
        amount: Cents,
        method: Option<PayoutMethod>,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError>;

    /// Credits the caller's savings and contribution total with a payment made outside the gateway.
    async fn record_contribution(
        &self,
        ctx: &RequestContext,
        contribution: NewContribution,
    ) -> Result<TransferReceipt, LedgerError>;

    /// Sets the withdrawal lock of the target member.
    async fn set_withdrawal_lock(
        &self,
        ctx: &RequestContext,
        target_member_id: i64,
        locked: bool,
    ) -> Result<TransferReceipt, LedgerError>;

    /// Soft-deletes a member. Their balances are left untouched.
    async fn deactivate_member(&self, ctx: &RequestContext, member_id: i64) -> Result<TransferReceipt, LedgerError>;

    /// Moves a loan from `pending` to `approved`.
    async fn approve_loan(&self, ctx: &RequestContext, loan_id: i64) -> Result<LoanReceipt, LedgerError>;

    /// Pays an approved loan out of the central wallet into the borrower's MGR wallet, and activates the loan.
    async fn disburse_loan_funds(
        &self,
        ctx: &RequestContext,
        loan_id: i64,
        amount: Cents,
        destination: &str,
    ) -> Result<LoanReceipt, LedgerError>;
}
