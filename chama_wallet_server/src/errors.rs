use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use chama_ledger::LedgerError;
use log::error;
use paystack_tools::PaystackApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Authentication Error. {0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Ledger(#[from] LedgerError),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Ledger(e) => match e {
                LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::Authorization(_) => StatusCode::FORBIDDEN,
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::UnknownReference(_) => StatusCode::NOT_FOUND,
                LedgerError::InsufficientBalance { .. } => StatusCode::CONFLICT,
                LedgerError::Locked => StatusCode::CONFLICT,
                LedgerError::InvalidState(_) => StatusCode::CONFLICT,
                LedgerError::DuplicateCallback(_) => StatusCode::CONFLICT,
                LedgerError::Gateway(_) => StatusCode::BAD_GATEWAY,
                LedgerError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internal errors are logged, not returned
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("💻️ {self}");
            "An internal error occurred. Please try again later.".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "error": message }).to_string())
    }
}

impl From<PaystackApiError> for ServerError {
    fn from(e: PaystackApiError) -> Self {
        Self::InitializeError(format!("Could not create the Paystack client. {e}"))
    }
}

#[cfg(test)]
mod test {
    use chama_common::Cents;
    use chama_ledger::db_types::Bucket;

    use super::*;

    #[test]
    fn ledger_errors_map_to_status_codes() {
        let cases = [
            (LedgerError::Validation("Amount must be positive".into()), StatusCode::BAD_REQUEST),
            (LedgerError::Authorization("no".into()), StatusCode::FORBIDDEN),
            (LedgerError::NotFound("Member #3 not found".into()), StatusCode::NOT_FOUND),
            (
                LedgerError::InsufficientBalance { bucket: Bucket::Mgr, available: Cents::from(30_000) },
                StatusCode::CONFLICT,
            ),
            (LedgerError::Locked, StatusCode::CONFLICT),
            (LedgerError::InvalidState("Loan is not approved".into()), StatusCode::CONFLICT),
            (LedgerError::Gateway("timed out".into()), StatusCode::BAD_GATEWAY),
            (LedgerError::DatabaseError("disk I/O error".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status_code(), status);
        }
        assert_eq!(ServerError::Unauthenticated("missing".into()).status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn insufficient_balance_reports_what_is_available() {
        let err = ServerError::from(LedgerError::InsufficientBalance {
            bucket: Bucket::Mgr,
            available: Cents::from(40_000),
        });
        assert_eq!(err.to_string(), "Insufficient MGR wallet balance. Available: KES 400.00");
    }
}
