use std::time::Duration;

use chama_common::Secret;
use log::*;

pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHANNELS: [&str; 5] = ["card", "bank", "ussd", "mobile_money", "bank_transfer"];

#[derive(Debug, Clone, Default)]
pub struct PaystackConfig {
    pub base_url: String,
    pub secret_key: Secret<String>,
    /// Where Paystack redirects the payer after checkout. Omitted from requests when `None`.
    pub callback_url: Option<String>,
    pub timeout: Duration,
}

impl PaystackConfig {
    pub fn new(secret_key: &str) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            secret_key: Secret::new(secret_key.to_string()),
            callback_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("CHAMA_PAYSTACK_BASE_URL").unwrap_or_else(|_| {
            info!("🪛️ CHAMA_PAYSTACK_BASE_URL not set, using {DEFAULT_BASE_URL}");
            DEFAULT_BASE_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("CHAMA_PAYSTACK_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ CHAMA_PAYSTACK_SECRET_KEY not set. Calls to Paystack will be rejected.");
            String::default()
        }));
        let callback_url = std::env::var("CHAMA_PAYSTACK_CALLBACK_URL").ok().filter(|s| !s.trim().is_empty());
        let timeout = std::env::var("CHAMA_PAYSTACK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid value for CHAMA_PAYSTACK_TIMEOUT_SECS '{s}'. {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { base_url, secret_key, callback_url, timeout: Duration::from_secs(timeout) }
    }
}
