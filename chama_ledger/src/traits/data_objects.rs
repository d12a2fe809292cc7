use chama_common::Cents;

use crate::db_types::{
    AuditEntry,
    Bucket,
    CentralWallet,
    Loan,
    LoanDisbursement,
    Member,
    Notification,
    PaymentTransaction,
    Payout,
    UserWallet,
};

/// The outcome of a committed member-level operation.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// The member whose balances the caller asked about, after the operation. For locks, this is the target.
    pub member: Member,
    /// The other member affected by the operation, e.g. the recipient of a `send`.
    pub counterparty: Option<Member>,
    /// `WD-` reference for withdrawals, the contribution reference for contributions.
    pub reference: Option<String>,
    pub payout: Option<Payout>,
    pub user_wallet: Option<UserWallet>,
    pub audit: AuditEntry,
    pub notification: Option<Notification>,
}

impl TransferReceipt {
    pub fn new(member: Member, audit: AuditEntry) -> Self {
        Self {
            member,
            counterparty: None,
            reference: None,
            payout: None,
            user_wallet: None,
            audit,
            notification: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoanReceipt {
    pub loan: Loan,
    pub borrower: Member,
    pub central_wallet: Option<CentralWallet>,
    pub disbursement: Option<LoanDisbursement>,
    pub audit: AuditEntry,
    pub notification: Option<Notification>,
}

#[derive(Debug, Clone)]
pub struct NewContribution {
    pub amount: Cents,
    pub payment_method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A successful charge, as reported by the gateway.
#[derive(Debug, Clone)]
pub struct ChargeSettlement {
    pub reference: String,
    /// The amount the gateway claims was paid. It is only used to check that the payer paid enough.
    pub gateway_amount: Cents,
    pub gateway_response: Option<String>,
    pub paid_at: Option<String>,
    /// The raw event, stored verbatim for reconciliation.
    pub payload: String,
    pub fee_bps: u32,
}

#[derive(Debug, Clone)]
pub struct ChargeFailure {
    pub reference: String,
    pub gateway_response: String,
    pub payload: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    pub payment: PaymentTransaction,
    pub fee: Cents,
    pub net: Cents,
    pub bucket: Bucket,
    pub audit: AuditEntry,
}

#[derive(Debug, Clone)]
pub struct PayoutReceipt {
    pub payout: Payout,
    pub member: Member,
    pub audit: AuditEntry,
    pub notification: Option<Notification>,
}
