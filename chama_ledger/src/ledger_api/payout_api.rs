use std::fmt::Debug;

use log::*;
use serde::Serialize;

use crate::{
    db_types::{Payout, PayoutStatus},
    events::{EventProducers, NotificationEvent},
    traits::{LedgerError, LedgerQueries, PaymentDatabase, PaymentGateway, PayoutRequest},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PayoutRunSummary {
    pub completed: usize,
    pub failed: usize,
    /// Payouts whose outcome at the gateway is unknown. They are retried on the next run.
    pub pending: usize,
}

/// Pushes pending external withdrawals out through the gateway.
///
/// A payout that the gateway refuses is refunded to the member's MGR wallet. A payout whose transfer timed out stays
/// pending: the payout reference is the gateway's idempotency key, so the next attempt cannot pay twice.
pub struct PayoutApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PayoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B: Clone, G: Clone> Clone for PayoutApi<B, G> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), gateway: self.gateway.clone(), producers: self.producers.clone() }
    }
}

impl<B, G> PayoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> PayoutApi<B, G>
where
    B: PaymentDatabase + LedgerQueries,
    G: PaymentGateway,
{
    /// Submits up to `limit` pending payouts, oldest first.
    pub async fn process_pending_payouts(&self, limit: i64) -> Result<PayoutRunSummary, LedgerError> {
        let payouts = self.db.fetch_pending_payouts(limit).await?;
        let mut summary = PayoutRunSummary::default();
        if payouts.is_empty() {
            return Ok(summary);
        }
        debug!("💳️ Submitting {} pending payouts", payouts.len());
        for payout in payouts {
            let reference = payout.reference.clone();
            match self.settle_payout(payout).await {
                Ok(PayoutStatus::Completed) => summary.completed += 1,
                Ok(PayoutStatus::Failed) => summary.failed += 1,
                Ok(PayoutStatus::Pending) => summary.pending += 1,
                Err(e) => {
                    error!("💳️ Could not settle payout {reference}. {e}");
                    summary.pending += 1;
                },
            }
        }
        info!(
            "💳️ Payout run complete. {} completed, {} failed, {} still pending",
            summary.completed, summary.failed, summary.pending
        );
        Ok(summary)
    }

    /// Sends a single payout to the gateway and records the result.
    pub async fn settle_payout(&self, payout: Payout) -> Result<PayoutStatus, LedgerError> {
        let recipient_name = match self.db.fetch_member(payout.member_id).await? {
            Some(m) => m.name().to_string(),
            None => payout.user_id.clone(),
        };
        let request = PayoutRequest {
            reference: payout.reference.clone(),
            amount: payout.amount,
            method: payout.method,
            details: payout.details.0.clone(),
            recipient_name,
        };
        match self.gateway.transfer(request).await {
            Ok(confirmation) => {
                self.db.complete_payout(payout.id, &confirmation.transfer_code).await?;
                info!("💳️ Payout {} of {} sent ({})", payout.reference, payout.amount, confirmation.status);
                Ok(PayoutStatus::Completed)
            },
            Err(e) if e.is_indeterminate() => {
                warn!("💳️ Payout {} timed out at the gateway. It will be retried. {e}", payout.reference);
                Ok(PayoutStatus::Pending)
            },
            Err(e) => {
                let receipt = self.db.fail_payout(payout.id, &e.to_string()).await?;
                warn!(
                    "💳️ Payout {} failed and {} was refunded to member #{}. {e}",
                    payout.reference, payout.amount, receipt.member.id
                );
                if let Some(n) = receipt.notification {
                    self.producers.publish_notification(NotificationEvent::new(n)).await;
                }
                Ok(PayoutStatus::Failed)
            },
        }
    }
}
