//! The wallet operations a member can request over HTTP, as one closed, tagged type.
//!
//! ```json
//! { "operation": "withdraw", "chamaId": 3, "amount": 250.5, "payoutMethod": "mpesa",
//!   "payoutDetails": { "phoneNumber": "0712345678" } }
//! ```
use std::fmt::Debug;

use chama_common::{major_units, Cents};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{MemberBalances, PayoutDetails, PayoutMethod},
    events::EventProducers,
    ledger_api::{lock_api::LockApi, transfer_api::TransferApi, RequestContext},
    traits::{LedgerDatabase, LedgerError, LedgerQueries, TransferReceipt},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRequest {
    pub chama_id: i64,
    #[serde(flatten)]
    pub operation: WalletOperation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum WalletOperation {
    #[serde(rename = "topup")]
    TopUp {
        #[serde(with = "major_units")]
        amount: Cents,
    },
    #[serde(rename_all = "camelCase")]
    Withdraw {
        #[serde(with = "major_units")]
        amount: Cents,
        payout_method: PayoutMethod,
        #[serde(default)]
        payout_details: PayoutDetails,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        #[serde(with = "major_units")]
        amount: Cents,
        recipient_member_id: i64,
        #[serde(default)]
        payout_method: Option<PayoutMethod>,
        #[serde(default)]
        payout_details: PayoutDetails,
    },
    #[serde(rename_all = "camelCase")]
    Lock { target_member_id: i64 },
    #[serde(rename_all = "camelCase")]
    Unlock { target_member_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_balances: Option<MemberBalances>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl WalletResponse {
    fn from_receipt<S: Into<String>>(message: S, receipt: TransferReceipt) -> Self {
        Self {
            success: true,
            message: message.into(),
            new_balances: Some(receipt.member.balances()),
            reference: receipt.reference,
        }
    }
}

/// Resolves the caller's membership and dispatches a [`WalletOperation`] to the transfer or lock API.
pub struct WalletApi<B> {
    db: B,
    transfers: TransferApi<B>,
    locks: LockApi<B>,
}

impl<B> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi")
    }
}

impl<B: Clone> Clone for WalletApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), transfers: self.transfers.clone(), locks: self.locks.clone() }
    }
}

impl<B: Clone> WalletApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let transfers = TransferApi::new(db.clone(), producers.clone());
        let locks = LockApi::new(db.clone(), producers);
        Self { db, transfers, locks }
    }
}

impl<B> WalletApi<B>
where B: LedgerDatabase + LedgerQueries
{
    /// Builds the context for `user_id` acting in `chama_id`. Only active members of the chama get one.
    pub async fn context_for(&self, user_id: &str, chama_id: i64) -> Result<RequestContext, LedgerError> {
        match self.db.fetch_member_for_user(user_id, chama_id).await? {
            Some(member) => Ok(RequestContext::for_member(&member)),
            None => {
                debug!("🔄️ User {user_id} is not an active member of chama #{chama_id}");
                Err(LedgerError::Authorization("You are not an active member of this chama".into()))
            },
        }
    }

    pub async fn execute(&self, user_id: &str, request: WalletRequest) -> Result<WalletResponse, LedgerError> {
        let ctx = self.context_for(user_id, request.chama_id).await?;
        self.dispatch(&ctx, request.operation).await
    }

    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        operation: WalletOperation,
    ) -> Result<WalletResponse, LedgerError> {
        let response = match operation {
            WalletOperation::TopUp { amount } => {
                let receipt = self.transfers.top_up(ctx, amount).await?;
                WalletResponse::from_receipt(format!("Successfully topped up {amount} to your MGR wallet"), receipt)
            },
            WalletOperation::Withdraw { amount, payout_method, payout_details } => {
                let receipt = self.transfers.withdraw(ctx, amount, payout_method, &payout_details).await?;
                let message = match payout_method {
                    PayoutMethod::Internal => format!("Successfully withdrew {amount} to your wallet"),
                    method => format!("Withdrawal of {amount} via {method} is being processed"),
                };
                WalletResponse::from_receipt(message, receipt)
            },
            WalletOperation::Send { amount, recipient_member_id, payout_method, payout_details } => {
                let receipt =
                    self.transfers.send(ctx, recipient_member_id, amount, payout_method, &payout_details).await?;
                let name = receipt.counterparty.as_ref().map(|m| m.name().to_string()).unwrap_or_default();
                WalletResponse::from_receipt(format!("Successfully sent {amount} to {name}"), receipt)
            },
            WalletOperation::Lock { target_member_id } => {
                let receipt = self.locks.lock(ctx, target_member_id).await?;
                let message = format!("Withdrawals locked for {}", receipt.member.name());
                WalletResponse::from_receipt(message, receipt)
            },
            WalletOperation::Unlock { target_member_id } => {
                let receipt = self.locks.unlock(ctx, target_member_id).await?;
                let message = format!("Withdrawals unlocked for {}", receipt.member.name());
                WalletResponse::from_receipt(message, receipt)
            },
        };
        Ok(response)
    }
}
