use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaystackApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to Paystack timed out: {0}")]
    Timeout(String),
    #[error("Could not reach Paystack: {0}")]
    Transport(String),
    #[error("Paystack rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Paystack returned a successful response without any data")]
    EmptyResponse,
}

impl PaystackApiError {
    /// True when the outcome of the request is unknown, i.e. Paystack may or may not have acted on it.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for PaystackApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
