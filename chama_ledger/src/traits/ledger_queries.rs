use crate::{
    db_types::{
        AuditEntry,
        CentralWallet,
        Chama,
        Contribution,
        Loan,
        Member,
        Notification,
        PaymentTransaction,
        Payout,
        UserWallet,
    },
    traits::LedgerError,
};

#[allow(async_fn_in_trait)]
pub trait LedgerQueries {
    async fn fetch_chama(&self, chama_id: i64) -> Result<Option<Chama>, LedgerError>;

    async fn fetch_member(&self, member_id: i64) -> Result<Option<Member>, LedgerError>;

    /// The active membership of `user_id` in the given chama, if any.
    async fn fetch_member_for_user(&self, user_id: &str, chama_id: i64) -> Result<Option<Member>, LedgerError>;

    async fn fetch_members_for_chama(&self, chama_id: i64) -> Result<Vec<Member>, LedgerError>;

    async fn fetch_central_wallet(&self, chama_id: i64) -> Result<Option<CentralWallet>, LedgerError>;

    async fn fetch_user_wallet(&self, user_id: &str) -> Result<Option<UserWallet>, LedgerError>;

    async fn fetch_loan(&self, loan_id: i64) -> Result<Option<Loan>, LedgerError>;

    async fn fetch_contributions_for_member(&self, member_id: i64) -> Result<Vec<Contribution>, LedgerError>;

    async fn fetch_payments_for_user(&self, user_id: &str) -> Result<Vec<PaymentTransaction>, LedgerError>;

    async fn fetch_payouts_for_member(&self, member_id: i64) -> Result<Vec<Payout>, LedgerError>;

    /// Most recent entries first.
    async fn fetch_audit_log(&self, chama_id: i64, limit: i64) -> Result<Vec<AuditEntry>, LedgerError>;

    /// Most recent notifications first.
    async fn fetch_notifications_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>, LedgerError>;
}
