//! Paystack as the ledger's [`PaymentGateway`].
//!
//! The ledger only knows about the gateway seam. This module adapts [`PaystackApi`] to it: amounts go out in KES
//! minor units, verification statuses are collapsed into [`ChargeStatus`], and payouts become a transfer recipient
//! plus a transfer.
use chama_common::{Cents, CURRENCY_CODE};
use chama_ledger::{
    db_types::PayoutMethod,
    traits::{
        ChargeStatus,
        GatewayCharge,
        GatewayError,
        GatewayEvent,
        GatewaySession,
        PaymentGateway,
        PayoutRequest,
        SessionRequest,
        TransferConfirmation,
    },
};
use log::*;
use paystack_tools::{
    InitializeTransaction,
    NewTransfer,
    NewTransferRecipient,
    PaystackApi,
    PaystackApiError,
    PaystackConfig,
    VerifiedTransaction,
    WebhookEvent,
};
use serde_json::Value;

pub const MPESA_BANK_CODE: &str = "MPESA";
pub const AIRTEL_BANK_CODE: &str = "AIRTEL";
const MOBILE_MONEY_RECIPIENT: &str = "mobile_money";
const BANK_RECIPIENT: &str = "kepss";

#[derive(Clone)]
pub struct PaystackGateway {
    api: PaystackApi,
}

impl PaystackGateway {
    pub fn new(config: PaystackConfig) -> Result<Self, PaystackApiError> {
        let api = PaystackApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &PaystackApi {
        &self.api
    }
}

impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, request: SessionRequest) -> Result<GatewaySession, GatewayError> {
        let transaction = InitializeTransaction {
            email: request.email,
            amount: request.amount.value(),
            currency: CURRENCY_CODE.to_string(),
            reference: request.reference,
            callback_url: None,
            metadata: request.metadata,
            channels: request.channels,
        };
        let session = self.api.initialize_transaction(transaction).await.map_err(gateway_error)?;
        Ok(GatewaySession {
            authorization_url: session.authorization_url,
            access_code: session.access_code,
            reference: session.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayCharge, GatewayError> {
        let transaction = self.api.verify_transaction(reference).await.map_err(gateway_error)?;
        Ok(charge_from_transaction(transaction))
    }

    async fn transfer(&self, request: PayoutRequest) -> Result<TransferConfirmation, GatewayError> {
        let recipient = transfer_recipient(&request)?;
        let recipient = self.api.create_transfer_recipient(recipient).await.map_err(gateway_error)?;
        let transfer = NewTransfer {
            source: "balance".to_string(),
            amount: request.amount.value(),
            recipient: recipient.recipient_code,
            reason: format!("Chama wallet withdrawal {}", request.reference),
            reference: request.reference,
        };
        let transfer = self.api.initiate_transfer(transfer).await.map_err(gateway_error)?;
        if matches!(transfer.status.as_str(), "failed" | "reversed" | "rejected") {
            return Err(GatewayError::Rejected(format!(
                "Transfer {} has status '{}'",
                transfer.transfer_code, transfer.status
            )));
        }
        Ok(TransferConfirmation { transfer_code: transfer.transfer_code, status: transfer.status })
    }
}

/// Reads a webhook body into a [`GatewayEvent`]. The signature must already have been checked.
pub fn parse_webhook(body: &[u8]) -> Result<GatewayEvent, serde_json::Error> {
    let event = serde_json::from_slice::<WebhookEvent>(body)?;
    Ok(GatewayEvent {
        kind: event.event.as_str().into(),
        reference: event.data.reference,
        amount: Cents::from(event.data.amount),
        gateway_response: event.data.gateway_response,
        paid_at: event.data.paid_at,
        payload: String::from_utf8_lossy(body).into_owned(),
    })
}

fn charge_from_transaction(transaction: VerifiedTransaction) -> GatewayCharge {
    // "abandoned" is not final from the ledger's point of view. The payer can still come back and pay.
    let status = match transaction.status.as_str() {
        "success" => ChargeStatus::Success,
        "failed" | "reversed" => ChargeStatus::Failed,
        _ => ChargeStatus::Pending,
    };
    let raw = serde_json::to_value(&transaction).unwrap_or(Value::Null);
    GatewayCharge {
        reference: transaction.reference,
        status,
        amount: Cents::from(transaction.amount),
        gateway_response: transaction.gateway_response,
        paid_at: transaction.paid_at,
        raw,
    }
}

fn transfer_recipient(request: &PayoutRequest) -> Result<NewTransferRecipient, GatewayError> {
    let details = &request.details;
    let (recipient_type, account_number, bank_code) = match request.method {
        PayoutMethod::Mpesa => (MOBILE_MONEY_RECIPIENT, details.phone_number.clone(), Some(MPESA_BANK_CODE.into())),
        PayoutMethod::Airtel => (MOBILE_MONEY_RECIPIENT, details.phone_number.clone(), Some(AIRTEL_BANK_CODE.into())),
        // The bank name carries Paystack's bank code for the member's bank
        PayoutMethod::Bank => (BANK_RECIPIENT, details.account_number.clone(), details.bank_name.clone()),
        PayoutMethod::Internal => {
            return Err(GatewayError::Rejected("Internal payouts never leave the ledger".into()));
        },
    };
    let (Some(account_number), Some(bank_code)) = (account_number, bank_code) else {
        return Err(GatewayError::Rejected(format!(
            "Payout {} is missing the account details for a {} transfer",
            request.reference, request.method
        )));
    };
    Ok(NewTransferRecipient {
        recipient_type: recipient_type.to_string(),
        name: request.recipient_name.clone(),
        account_number,
        bank_code,
        currency: CURRENCY_CODE.to_string(),
    })
}

fn gateway_error(e: PaystackApiError) -> GatewayError {
    debug!("💳️ Paystack call failed. {e}");
    match e {
        PaystackApiError::Timeout(s) => GatewayError::Timeout(s),
        PaystackApiError::Rejected { status, message } => GatewayError::Rejected(format!("{status}: {message}")),
        PaystackApiError::Transport(s) | PaystackApiError::Initialization(s) => GatewayError::Transport(s),
        PaystackApiError::JsonError(s) => GatewayError::InvalidResponse(s),
        PaystackApiError::EmptyResponse => GatewayError::InvalidResponse("Paystack returned no data".into()),
    }
}
