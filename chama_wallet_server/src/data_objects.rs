use std::fmt::Display;

use chama_common::{major_units, Cents};
use chama_ledger::{
    db_types::{CentralWallet, Loan, LoanDisbursement, MemberBalances},
    traits::{LoanReceipt, NewContribution},
    PaymentSession,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub session: PaymentSession,
}

impl PaymentSessionResponse {
    pub fn new(session: PaymentSession) -> Self {
        Self { success: true, session }
    }
}

/// `?limit=n` on listing endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page_size")]
    pub limit: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// A contribution paid outside the gateway, e.g. in cash at a meeting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRequest {
    pub chama_id: i64,
    #[serde(with = "major_units")]
    pub amount: Cents,
    pub payment_method: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<ContributionRequest> for NewContribution {
    fn from(req: ContributionRequest) -> Self {
        Self { amount: req.amount, payment_method: req.payment_method, reference: req.reference, notes: req.notes }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionResponse {
    pub success: bool,
    pub message: String,
    pub new_balances: MemberBalances,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisburseLoanRequest {
    pub chama_id: i64,
    pub loan_id: i64,
    #[serde(with = "major_units")]
    pub amount: Cents,
    #[serde(default = "default_destination")]
    pub destination: String,
}

fn default_destination() -> String {
    "mgr_wallet".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChamaParams {
    pub chama_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub success: bool,
    pub message: String,
    pub loan: Loan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disbursement: Option<LoanDisbursement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub central_wallet: Option<CentralWallet>,
}

impl LoanResponse {
    pub fn from_receipt<S: Into<String>>(message: S, receipt: LoanReceipt) -> Self {
        Self {
            success: true,
            message: message.into(),
            loan: receipt.loan,
            disbursement: receipt.disbursement,
            central_wallet: receipt.central_wallet,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contribution_request_takes_major_units() {
        let req: ContributionRequest =
            serde_json::from_str(r#"{"chamaId": 4, "amount": 1500.5, "paymentMethod": "cash"}"#).unwrap();
        assert_eq!(req.amount, Cents::from(150_050));
        assert!(req.reference.is_none());
        let contribution = NewContribution::from(req);
        assert_eq!(contribution.payment_method, "cash");
    }

    #[test]
    fn disbursement_defaults_to_the_mgr_wallet() {
        let req: DisburseLoanRequest =
            serde_json::from_str(r#"{"chamaId": 1, "loanId": 9, "amount": 5000}"#).unwrap();
        assert_eq!(req.destination, "mgr_wallet");
        assert_eq!(req.amount, Cents::from_shillings(5000));
    }
}
