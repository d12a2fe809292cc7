use std::fmt::Debug;

use serde::Serialize;

use crate::{
    db_types::{AuditEntry, CentralWallet, Contribution, Member, Notification, PaymentTransaction, Payout, UserWallet},
    ledger_api::RequestContext,
    traits::{LedgerError, LedgerQueries},
};

/// The largest page any listing returns.
pub const MAX_PAGE_SIZE: i64 = 500;

/// A member's view of their own standing in a chama.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberOverview {
    pub member: Member,
    pub central_wallet: Option<CentralWallet>,
    pub user_wallet: Option<UserWallet>,
}

/// Read-only access to the ledger.
#[derive(Clone)]
pub struct QueryApi<B> {
    db: B,
}

impl<B: Debug> Debug for QueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueryApi ({:?})", self.db)
    }
}

impl<B> QueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> QueryApi<B>
where B: LedgerQueries
{
    pub async fn member_overview(&self, ctx: &RequestContext) -> Result<MemberOverview, LedgerError> {
        let member = self
            .db
            .fetch_member(ctx.member_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Member #{} not found", ctx.member_id)))?;
        let central_wallet = self.db.fetch_central_wallet(ctx.chama_id).await?;
        let user_wallet = self.db.fetch_user_wallet(&ctx.user_id).await?;
        Ok(MemberOverview { member, central_wallet, user_wallet })
    }

    /// The chama's audit trail, newest first. Only officers of the chama may read it.
    pub async fn audit_log(&self, ctx: &RequestContext, limit: i64) -> Result<Vec<AuditEntry>, LedgerError> {
        if !ctx.role.can_manage_loans() {
            return Err(LedgerError::Authorization("Only chama officers can view the audit log".into()));
        }
        self.db.fetch_audit_log(ctx.chama_id, clamp(limit)).await
    }

    pub async fn notifications(&self, user_id: &str, limit: i64) -> Result<Vec<Notification>, LedgerError> {
        self.db.fetch_notifications_for_user(user_id, clamp(limit)).await
    }

    pub async fn contributions(&self, ctx: &RequestContext) -> Result<Vec<Contribution>, LedgerError> {
        self.db.fetch_contributions_for_member(ctx.member_id).await
    }

    pub async fn payouts(&self, ctx: &RequestContext) -> Result<Vec<Payout>, LedgerError> {
        self.db.fetch_payouts_for_member(ctx.member_id).await
    }

    pub async fn payments(&self, user_id: &str) -> Result<Vec<PaymentTransaction>, LedgerError> {
        self.db.fetch_payments_for_user(user_id).await
    }

    pub async fn members(&self, ctx: &RequestContext) -> Result<Vec<Member>, LedgerError> {
        self.db.fetch_members_for_chama(ctx.chama_id).await
    }
}

fn clamp(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}
