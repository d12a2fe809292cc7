use std::fmt::Debug;

use chama_common::Cents;
use log::*;

use crate::{
    db_types::{Notification, PayoutDetails, PayoutMethod},
    events::{EventProducers, NotificationEvent},
    ledger_api::{ensure_positive, RequestContext},
    traits::{LedgerDatabase, LedgerError, LoanReceipt, NewContribution, TransferReceipt},
};

/// `TransferApi` is the entry point for every balance-affecting operation a member or an officer of a chama asks
/// for. It validates the request, lets the backend commit it atomically, and then publishes the resulting
/// notification.
pub struct TransferApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for TransferApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransferApi")
    }
}

impl<B: Clone> Clone for TransferApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> TransferApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> TransferApi<B>
where B: LedgerDatabase
{
    /// Moves `amount` from the caller's savings into their MGR wallet.
    pub async fn top_up(&self, ctx: &RequestContext, amount: Cents) -> Result<TransferReceipt, LedgerError> {
        ensure_positive(amount)?;
        let receipt = self.db.top_up(ctx, amount).await?;
        info!("🔄️ Member #{} topped up their MGR wallet with {amount}", ctx.member_id);
        Ok(receipt)
    }

    /// Takes `amount` out of the caller's MGR wallet.
    ///
    /// Internal withdrawals land in the member's personal wallet straight away. Everything else creates a pending
    /// payout that the payout worker pushes through the gateway later. The receipt carries the `WD-` reference.
    pub async fn withdraw(
        &self,
        ctx: &RequestContext,
        amount: Cents,
        method: PayoutMethod,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_positive(amount)?;
        validate_payout_details(method, details)?;
        let receipt = self.db.withdraw(ctx, amount, method, details).await?;
        info!(
            "🔄️ Member #{} withdrew {amount} via {method}. Reference: {}",
            ctx.member_id,
            receipt.reference.as_deref().unwrap_or_default()
        );
        Ok(receipt)
    }

    /// Sends `amount` from the caller's MGR wallet to the MGR wallet of another member of the same chama.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        recipient_member_id: i64,
        amount: Cents,
        method: Option<PayoutMethod>,
        details: &PayoutDetails,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_positive(amount)?;
        if recipient_member_id == ctx.member_id {
            return Err(LedgerError::Validation("You cannot send funds to yourself".into()));
        }
        let receipt = self.db.send(ctx, recipient_member_id, amount, method, details).await?;
        info!("🔄️ Member #{} sent {amount} to member #{recipient_member_id}", ctx.member_id);
        self.notify(receipt.notification.as_ref()).await;
        Ok(receipt)
    }

    /// Records money the caller paid into the chama outside the gateway (cash, a direct M-Pesa transfer).
    pub async fn record_contribution(
        &self,
        ctx: &RequestContext,
        contribution: NewContribution,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_positive(contribution.amount)?;
        if contribution.payment_method.trim().is_empty() {
            return Err(LedgerError::Validation("A payment method is required".into()));
        }
        let amount = contribution.amount;
        let receipt = self.db.record_contribution(ctx, contribution).await?;
        info!("🔄️ Member #{} contributed {amount} to chama #{}", ctx.member_id, ctx.chama_id);
        Ok(receipt)
    }

    pub async fn approve_loan(&self, ctx: &RequestContext, loan_id: i64) -> Result<LoanReceipt, LedgerError> {
        ensure_loan_officer(ctx)?;
        let receipt = self.db.approve_loan(ctx, loan_id).await?;
        info!("🔄️ Loan #{loan_id} approved by member #{}", ctx.member_id);
        self.notify(receipt.notification.as_ref()).await;
        Ok(receipt)
    }

    /// Pays an approved loan out of the chama's central wallet into the borrower's MGR wallet.
    pub async fn disburse_loan_funds(
        &self,
        ctx: &RequestContext,
        loan_id: i64,
        amount: Cents,
        destination: &str,
    ) -> Result<LoanReceipt, LedgerError> {
        ensure_loan_officer(ctx)?;
        ensure_positive(amount)?;
        let receipt = self.db.disburse_loan_funds(ctx, loan_id, amount, destination).await?;
        info!("🔄️ Loan #{loan_id}: {amount} disbursed to member #{}", receipt.borrower.id);
        self.notify(receipt.notification.as_ref()).await;
        Ok(receipt)
    }

    async fn notify(&self, notification: Option<&Notification>) {
        if let Some(n) = notification {
            trace!("🔄️ Publishing {} notification for {}", n.notification_type, n.user_id);
            self.producers.publish_notification(NotificationEvent::new(n.clone())).await;
        }
    }
}

fn ensure_loan_officer(ctx: &RequestContext) -> Result<(), LedgerError> {
    if ctx.role.can_manage_loans() {
        Ok(())
    } else {
        Err(LedgerError::Authorization("Only chama admins, chairmen and treasurers can manage loans".into()))
    }
}

fn validate_payout_details(method: PayoutMethod, details: &PayoutDetails) -> Result<(), LedgerError> {
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    match method {
        PayoutMethod::Mpesa | PayoutMethod::Airtel if !present(&details.phone_number) => {
            Err(LedgerError::Validation(format!("A phone number is required for {method} withdrawals")))
        },
        PayoutMethod::Bank if !present(&details.account_number) || !present(&details.bank_name) => {
            Err(LedgerError::Validation("A bank name and account number are required for bank withdrawals".into()))
        },
        _ => Ok(()),
    }
}
