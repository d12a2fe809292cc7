use chama_common::Cents;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::{PayoutDetails, PayoutMethod};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway did not answer in time. It may or may not have acted on the request.
    #[error("The payment gateway timed out: {0}")]
    Timeout(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("Could not reach the payment gateway: {0}")]
    Transport(String),
    #[error("Unexpected response from the payment gateway: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// The outcome of the request is unknown, so local state must not be finalised.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, GatewayError::Timeout(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub email: String,
    pub amount: Cents,
    pub reference: String,
    pub metadata: Value,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    /// Still in progress, or abandoned by the payer without a final result.
    Pending,
}

/// The state of a charge as reported by the gateway's verification endpoint.
#[derive(Debug, Clone)]
pub struct GatewayCharge {
    pub reference: String,
    pub status: ChargeStatus,
    pub amount: Cents,
    pub gateway_response: Option<String>,
    pub paid_at: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    ChargeSuccess,
    ChargeFailed,
    Other(String),
}

impl From<&str> for GatewayEventKind {
    fn from(event: &str) -> Self {
        match event {
            "charge.success" => GatewayEventKind::ChargeSuccess,
            "charge.failed" => GatewayEventKind::ChargeFailed,
            other => GatewayEventKind::Other(other.to_string()),
        }
    }
}

/// An asynchronous event about a charge, from a webhook or a verification poll. Everything in it is untrusted.
#[derive(Debug, Clone)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    pub reference: String,
    pub amount: Cents,
    pub gateway_response: Option<String>,
    pub paid_at: Option<String>,
    /// The raw payload as received
    pub payload: String,
}

impl GatewayCharge {
    /// Verification results go through the same settlement path as webhooks. Returns `None` while the charge is
    /// still pending at the gateway.
    pub fn into_event(self) -> Option<GatewayEvent> {
        let kind = match self.status {
            ChargeStatus::Success => GatewayEventKind::ChargeSuccess,
            ChargeStatus::Failed => GatewayEventKind::ChargeFailed,
            ChargeStatus::Pending => return None,
        };
        Some(GatewayEvent {
            kind,
            reference: self.reference,
            amount: self.amount,
            gateway_response: self.gateway_response,
            paid_at: self.paid_at,
            payload: self.raw.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub reference: String,
    pub amount: Cents,
    pub method: PayoutMethod,
    pub details: PayoutDetails,
    pub recipient_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfirmation {
    pub transfer_code: String,
    pub status: String,
}

/// The seam to the external payment gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Opens a checkout session for the given (locally generated) reference.
    async fn initialize(&self, request: SessionRequest) -> Result<GatewaySession, GatewayError>;

    /// Fetches the current state of a charge.
    async fn verify(&self, reference: &str) -> Result<GatewayCharge, GatewayError>;

    /// Sends money out to a member's mobile money or bank account. The payout reference doubles as the
    /// gateway's idempotency key, so retrying after a timeout is safe.
    async fn transfer(&self, request: PayoutRequest) -> Result<TransferConfirmation, GatewayError>;
}
