use std::fmt::Debug;

use log::*;

use crate::{
    events::{EventProducers, NotificationEvent},
    ledger_api::RequestContext,
    traits::{LedgerDatabase, LedgerError, TransferReceipt},
};

/// Withdrawal locks and membership status. Every method here is restricted to the admins and chairmen of the
/// target's chama. Unauthorised calls are rejected before the database is touched.
pub struct LockApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for LockApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LockApi")
    }
}

impl<B: Clone> Clone for LockApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> LockApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> LockApi<B>
where B: LedgerDatabase
{
    pub async fn lock(&self, ctx: &RequestContext, target_member_id: i64) -> Result<TransferReceipt, LedgerError> {
        self.set_lock(ctx, target_member_id, true).await
    }

    pub async fn unlock(&self, ctx: &RequestContext, target_member_id: i64) -> Result<TransferReceipt, LedgerError> {
        self.set_lock(ctx, target_member_id, false).await
    }

    /// Soft-deletes a member. Their balances stay on record but they can no longer transact or receive funds.
    pub async fn deactivate_member(
        &self,
        ctx: &RequestContext,
        target_member_id: i64,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_lock_manager(ctx)?;
        let receipt = self.db.deactivate_member(ctx, target_member_id).await?;
        info!("🔒️ Member #{target_member_id} deactivated by member #{}", ctx.member_id);
        self.notify(&receipt).await;
        Ok(receipt)
    }

    async fn set_lock(
        &self,
        ctx: &RequestContext,
        target_member_id: i64,
        locked: bool,
    ) -> Result<TransferReceipt, LedgerError> {
        if let Err(e) = ensure_lock_manager(ctx) {
            warn!(
                "🔒️ Member #{} ({}) tried to change the withdrawal lock of member #{target_member_id}",
                ctx.member_id, ctx.role
            );
            return Err(e);
        }
        let receipt = self.db.set_withdrawal_lock(ctx, target_member_id, locked).await?;
        let verb = if locked { "locked" } else { "unlocked" };
        info!("🔒️ Withdrawals for member #{target_member_id} {verb} by member #{}", ctx.member_id);
        self.notify(&receipt).await;
        Ok(receipt)
    }

    async fn notify(&self, receipt: &TransferReceipt) {
        if let Some(n) = &receipt.notification {
            self.producers.publish_notification(NotificationEvent::new(n.clone())).await;
        }
    }
}

fn ensure_lock_manager(ctx: &RequestContext) -> Result<(), LedgerError> {
    if ctx.role.can_manage_locks() {
        Ok(())
    } else {
        Err(LedgerError::Authorization("Only chama admins and chairmen can manage member withdrawals".into()))
    }
}
