use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every Paystack response is wrapped in this envelope. `status` is false when Paystack declined the request, in
/// which case `message` carries the reason.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InitializeTransaction {
    pub email: String,
    /// Amount in minor units (cents).
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub metadata: Value,
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VerifiedTransaction {
    pub reference: String,
    /// One of `success`, `failed`, `abandoned`, `ongoing`, `pending`, `reversed`...
    pub status: String,
    pub amount: i64,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub fees: Option<i64>,
}

impl VerifiedTransaction {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Paystack will not change the status of the transaction any further.
    pub fn is_final(&self) -> bool {
        matches!(self.status.as_str(), "success" | "failed" | "abandoned" | "reversed")
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewTransferRecipient {
    #[serde(rename = "type")]
    pub recipient_type: String,
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransferRecipient {
    pub recipient_code: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewTransfer {
    pub source: String,
    pub amount: i64,
    pub recipient: String,
    pub reason: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Transfer {
    pub transfer_code: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
}

/// The body of a webhook call. Only the fields the ledger relies on are typed; everything Paystack sends is kept in
/// the raw payload by the caller.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: ChargeData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChargeData {
    pub reference: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub gateway_response: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
}
