//! Gateway charge events arrive from two directions: the gateway's webhook, and our own verification polls. Both
//! end up in [`CallbackApi::process_event`], which is safe to call any number of times for the same reference.
use std::fmt::Debug;

use chama_common::Cents;
use log::*;

use crate::{
    events::{EventProducers, PaymentSettledEvent},
    traits::{ChargeFailure, ChargeSettlement, GatewayEvent, GatewayEventKind, LedgerError, PaymentDatabase},
};

/// What happened to a gateway event. None of these are errors from the gateway's point of view: the transport is
/// always acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The charge settled and its net amount was credited.
    Settled { reference: String, fee: Cents, net: Cents },
    /// The charge was marked as failed.
    Failed { reference: String },
    /// The payment was already final. Nothing changed.
    Duplicate { reference: String },
    /// No payment carries this reference.
    UnknownReference { reference: String },
    /// The event could not be applied and needs manual reconciliation.
    Unapplied { reference: String, reason: String },
    /// Not a charge event.
    Ignored { event: String },
}

impl CallbackOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, CallbackOutcome::Settled { .. })
    }
}

pub struct CallbackApi<B> {
    db: B,
    producers: EventProducers,
    fee_bps: u32,
}

impl<B> Debug for CallbackApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallbackApi (fee: {} bps)", self.fee_bps)
    }
}

impl<B: Clone> Clone for CallbackApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone(), fee_bps: self.fee_bps }
    }
}

impl<B> CallbackApi<B> {
    /// `fee_bps` is the platform fee, in basis points, withheld from every successful charge.
    pub fn new(db: B, producers: EventProducers, fee_bps: u32) -> Self {
        Self { db, producers, fee_bps }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn fee_bps(&self) -> u32 {
        self.fee_bps
    }
}

impl<B> CallbackApi<B>
where B: PaymentDatabase
{
    /// Applies a gateway event to the ledger. Never fails: anything that cannot be applied is logged, and the
    /// payment stays as it was.
    pub async fn process_event(&self, event: GatewayEvent) -> CallbackOutcome {
        let reference = event.reference.clone();
        let result = match event.kind {
            GatewayEventKind::ChargeSuccess => self.settle(event).await,
            GatewayEventKind::ChargeFailed => self.fail(event).await,
            GatewayEventKind::Other(name) => {
                debug!("📞️ Ignoring gateway event '{name}' for {reference}");
                return CallbackOutcome::Ignored { event: name };
            },
        };
        match result {
            Ok(outcome) => outcome,
            Err(LedgerError::DuplicateCallback(_)) => {
                info!("📞️ Payment {reference} is already final. Acknowledging the duplicate event.");
                CallbackOutcome::Duplicate { reference }
            },
            Err(LedgerError::UnknownReference(_)) => {
                warn!("📞️ Received an event for unknown payment reference {reference}");
                CallbackOutcome::UnknownReference { reference }
            },
            Err(e) => {
                error!("📞️ Could not apply the gateway event for {reference}. Manual reconciliation is needed. {e}");
                CallbackOutcome::Unapplied { reference, reason: e.to_string() }
            },
        }
    }

    async fn settle(&self, event: GatewayEvent) -> Result<CallbackOutcome, LedgerError> {
        let settlement = ChargeSettlement {
            reference: event.reference,
            gateway_amount: event.amount,
            gateway_response: event.gateway_response,
            paid_at: event.paid_at,
            payload: event.payload,
            fee_bps: self.fee_bps,
        };
        let receipt = self.db.settle_payment(settlement).await?;
        let reference = receipt.payment.reference.clone();
        info!(
            "📞️ Payment {reference} settled. {} credited to the {} after a fee of {}",
            receipt.net, receipt.bucket, receipt.fee
        );
        let (fee, net) = (receipt.fee, receipt.net);
        let event = PaymentSettledEvent::new(receipt.payment, fee, net);
        self.producers.publish_payment_settled(event).await;
        Ok(CallbackOutcome::Settled { reference, fee, net })
    }

    async fn fail(&self, event: GatewayEvent) -> Result<CallbackOutcome, LedgerError> {
        let failure = ChargeFailure {
            reference: event.reference,
            gateway_response: event.gateway_response.unwrap_or_else(|| "Payment failed".into()),
            payload: Some(event.payload),
        };
        let payment = self.db.fail_payment(failure).await?;
        info!(
            "📞️ Payment {} failed: {}",
            payment.reference,
            payment.gateway_response.as_deref().unwrap_or_default()
        );
        Ok(CallbackOutcome::Failed { reference: payment.reference })
    }
}
