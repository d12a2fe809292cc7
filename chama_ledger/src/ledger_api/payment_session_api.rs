use std::fmt::Debug;

use chama_common::{major_units, Cents};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    db_types::{LoanStatus, Member, NewPaymentTransaction, PaymentPurpose, PaymentTransaction},
    helpers::new_payment_reference,
    ledger_api::{callback_api::CallbackApi, ensure_positive},
    traits::{
        ChargeFailure,
        GatewayError,
        LedgerError,
        LedgerQueries,
        PaymentDatabase,
        PaymentGateway,
        SessionRequest,
    },
};

/// A request to pay money in through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub email: String,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub purpose: PaymentPurpose,
    #[serde(default)]
    pub chama_id: Option<i64>,
    #[serde(default)]
    pub loan_id: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Payment channels to offer at checkout. The gateway's defaults are used when empty.
    #[serde(default)]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

/// Opens gateway checkout sessions, and reconciles them by polling when the webhook is late or lost.
///
/// The local `pending` record is always written before the gateway is contacted, so a charge can never exist at the
/// gateway without a matching local reference.
pub struct PaymentSessionApi<B, G> {
    gateway: G,
    callbacks: CallbackApi<B>,
}

impl<B, G> Debug for PaymentSessionApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentSessionApi")
    }
}

impl<B: Clone, G: Clone> Clone for PaymentSessionApi<B, G> {
    fn clone(&self) -> Self {
        Self { gateway: self.gateway.clone(), callbacks: self.callbacks.clone() }
    }
}

impl<B, G> PaymentSessionApi<B, G> {
    pub fn new(gateway: G, callbacks: CallbackApi<B>) -> Self {
        Self { gateway, callbacks }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> PaymentSessionApi<B, G>
where
    B: PaymentDatabase + LedgerQueries,
    G: PaymentGateway,
{
    pub async fn initialize(&self, user_id: &str, request: PaymentRequest) -> Result<PaymentSession, LedgerError> {
        let email = request.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(LedgerError::Validation("A valid email address is required".into()));
        }
        ensure_positive(request.amount)?;
        let member = self.payer_context(user_id, &request).await?;
        let reference = new_payment_reference();
        let mut metadata = request.metadata.unwrap_or_else(|| json!({}));
        if let Value::Object(map) = &mut metadata {
            map.insert("purpose".into(), json!(request.purpose));
            map.insert("user_id".into(), json!(user_id));
            map.insert("chama_id".into(), json!(request.chama_id));
            map.insert("loan_id".into(), json!(request.loan_id));
        }
        let pending = NewPaymentTransaction {
            reference: reference.clone(),
            user_id: user_id.to_string(),
            email: email.clone(),
            chama_id: member.as_ref().map(|m| m.chama_id).or(request.chama_id),
            member_id: member.as_ref().map(|m| m.id),
            loan_id: request.loan_id,
            amount: request.amount,
            purpose: request.purpose,
            metadata: metadata.clone(),
        };
        let db = self.callbacks.db();
        db.insert_pending_payment(pending).await?;
        let session_request = SessionRequest {
            email,
            amount: request.amount,
            reference: reference.clone(),
            metadata,
            channels: request.channels,
        };
        // A session under another reference would settle a charge we have no record of
        let result = self.gateway.initialize(session_request).await.and_then(|session| {
            if session.reference == reference {
                Ok(session)
            } else {
                let msg = format!("Session opened under reference {} instead of {reference}", session.reference);
                Err(GatewayError::InvalidResponse(msg))
            }
        });
        match result {
            Ok(session) => {
                db.attach_gateway_session(&reference, &session.access_code, &session.authorization_url).await?;
                info!("💳️ Payment session {reference} opened for {} ({})", request.amount, request.purpose);
                Ok(PaymentSession {
                    authorization_url: session.authorization_url,
                    access_code: session.access_code,
                    reference,
                })
            },
            Err(e) if e.is_indeterminate() => {
                warn!("💳️ Payment {reference} is left pending. It will be reconciled by verification. {e}");
                Err(e.into())
            },
            Err(e) => {
                warn!("💳️ The gateway refused payment session {reference}. {e}");
                let failure = ChargeFailure { reference, gateway_response: e.to_string(), payload: None };
                db.fail_payment(failure).await?;
                Err(e.into())
            },
        }
    }

    /// Asks the gateway for the state of the charge and applies a final result through the same path as the
    /// webhook. Returns the payment as it stands afterwards.
    pub async fn verify(&self, user_id: &str, reference: &str) -> Result<PaymentTransaction, LedgerError> {
        let db = self.callbacks.db();
        let payment = db
            .fetch_payment(reference)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Payment {reference} not found")))?;
        if payment.status.is_final() {
            return Ok(payment);
        }
        let charge = self.gateway.verify(reference).await?;
        match charge.into_event() {
            Some(event) => {
                let outcome = self.callbacks.process_event(event).await;
                debug!("💳️ Verification of {reference}: {outcome:?}");
            },
            None => debug!("💳️ Payment {reference} is still pending at the gateway"),
        }
        let payment = db.fetch_payment(reference).await?;
        payment.ok_or_else(|| LedgerError::NotFound(format!("Payment {reference} not found")))
    }

    /// Checks that the caller may pay for the given purpose, and finds the member the payment will be credited to.
    async fn payer_context(&self, user_id: &str, request: &PaymentRequest) -> Result<Option<Member>, LedgerError> {
        let db = self.callbacks.db();
        let member = match request.chama_id {
            Some(chama_id) => db.fetch_member_for_user(user_id, chama_id).await?,
            None => None,
        };
        match request.purpose {
            PaymentPurpose::Other => Ok(member),
            PaymentPurpose::Registration => match request.chama_id {
                Some(chama_id) => match db.fetch_chama(chama_id).await? {
                    Some(_) => Ok(member),
                    None => Err(LedgerError::NotFound(format!("Chama #{chama_id} not found"))),
                },
                None => Err(LedgerError::Validation("Registration payments need a chama".into())),
            },
            PaymentPurpose::Contribution | PaymentPurpose::WalletTopup => match member {
                Some(m) => Ok(Some(m)),
                None => Err(LedgerError::Authorization("You are not an active member of this chama".into())),
            },
            PaymentPurpose::LoanRepayment => {
                let Some(member) = member else {
                    return Err(LedgerError::Authorization("You are not an active member of this chama".into()));
                };
                let loan_id =
                    request.loan_id.ok_or_else(|| LedgerError::Validation("Loan repayments need a loan".into()))?;
                let loan = db
                    .fetch_loan(loan_id)
                    .await?
                    .filter(|l| l.chama_id == member.chama_id && l.borrower_member_id == member.id)
                    .ok_or_else(|| LedgerError::NotFound(format!("Loan #{loan_id} not found")))?;
                if loan.status != LoanStatus::Active {
                    return Err(LedgerError::InvalidState(format!("Loan #{loan_id} is {}, not active", loan.status)));
                }
                if request.amount > loan.outstanding() {
                    return Err(LedgerError::Validation(format!(
                        "The outstanding balance on loan #{loan_id} is {}",
                        loan.outstanding()
                    )));
                }
                Ok(Some(member))
            },
        }
    }
}
