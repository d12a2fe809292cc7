use crate::{
    db_types::{NewPaymentTransaction, PaymentTransaction, Payout},
    traits::{
        data_objects::{ChargeFailure, ChargeSettlement, PayoutReceipt, SettlementReceipt},
        LedgerError,
    },
};

/// Payment sessions, their settlement into the ledger, and external payouts.
#[allow(async_fn_in_trait)]
pub trait PaymentDatabase: Clone {
    /// Stores a new payment session in `pending` state. The reference must be unique.
    async fn insert_pending_payment(&self, payment: NewPaymentTransaction) -> Result<PaymentTransaction, LedgerError>;

    /// Stores the access code and checkout URL issued by the gateway.
    async fn attach_gateway_session(
        &self,
        reference: &str,
        access_code: &str,
        authorization_url: &str,
    ) -> Result<PaymentTransaction, LedgerError>;

    async fn fetch_payment(&self, reference: &str) -> Result<Option<PaymentTransaction>, LedgerError>;

    /// Settles a successful charge, in a single atomic transaction:
    /// * the payment moves from `pending` to `success`. If it is no longer pending, nothing else happens and
    ///   [`LedgerError::DuplicateCallback`] is returned.
    /// * the platform fee is posted to the fee ledger,
    /// * the net amount is credited to the bucket implied by the payment's purpose,
    /// * an audit entry is written.
    ///
    /// If the gateway reports less than the stored amount, the payment is left pending and
    /// [`LedgerError::InvalidState`] is returned.
    async fn settle_payment(&self, settlement: ChargeSettlement) -> Result<SettlementReceipt, LedgerError>;

    /// Moves a pending payment to `failed`. No balances change.
    async fn fail_payment(&self, failure: ChargeFailure) -> Result<PaymentTransaction, LedgerError>;

    /// Pending payouts that must still go through the gateway.
    async fn fetch_pending_payouts(&self, limit: i64) -> Result<Vec<Payout>, LedgerError>;

    async fn fetch_payout(&self, reference: &str) -> Result<Option<Payout>, LedgerError>;

    async fn complete_payout(&self, payout_id: i64, transfer_code: &str) -> Result<Payout, LedgerError>;

    /// Marks the payout as failed and refunds its amount to the member's MGR wallet, atomically.
    async fn fail_payout(&self, payout_id: i64, reason: &str) -> Result<PayoutReceipt, LedgerError>;
}
