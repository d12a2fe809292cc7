use std::{env, time::Duration};

use chama_common::{
    helpers::{env_var_parsed, parse_boolean_flag},
    Secret,
};
use log::*;
use paystack_tools::PaystackConfig;

const DEFAULT_CHAMA_HOST: &str = "127.0.0.1";
const DEFAULT_CHAMA_PORT: u16 = 8460;
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 250;
pub const DEFAULT_USER_ID_HEADER: &str = "x-chama-user-id";
pub const PROXY_SECRET_HEADER: &str = "x-chama-proxy-secret";
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";
const DEFAULT_PAYOUT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The platform's cut of every gateway payment, in basis points.
    pub platform_fee_bps: u32,
    pub paystack: PaystackConfig,
    /// If false, webhook signatures are not checked. **DANGER**. Only for local testing against a mock gateway.
    pub signature_checks: bool,
    pub proxy: ProxyConfig,
    pub payout_worker: PayoutWorkerConfig,
    /// Every notification is also POSTed to this URL, if set.
    pub notification_webhook_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CHAMA_HOST.to_string(),
            port: DEFAULT_CHAMA_PORT,
            database_url: String::default(),
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            paystack: PaystackConfig::default(),
            signature_checks: true,
            proxy: ProxyConfig::default(),
            payout_worker: PayoutWorkerConfig::default(),
            notification_webhook_url: None,
        }
    }
}

/// The upstream auth proxy verifies the user's session, and forwards the user id in `user_id_header`. Every request
/// it forwards carries `secret` in the `x-chama-proxy-secret` header.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub secret: Secret<String>,
    pub user_id_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), user_id_header: DEFAULT_USER_ID_HEADER.to_string() }
    }
}

#[derive(Clone, Debug)]
pub struct PayoutWorkerConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for PayoutWorkerConfig {
    fn default() -> Self {
        Self { enabled: false, interval: DEFAULT_PAYOUT_INTERVAL }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CHAMA_HOST").ok().unwrap_or_else(|| DEFAULT_CHAMA_HOST.into());
        let port = env_var_parsed::<u16>("CHAMA_PORT")
            .unwrap_or_else(|e| {
                error!("🪛️ {e}. Using the default port, {DEFAULT_CHAMA_PORT}, instead.");
                None
            })
            .unwrap_or(DEFAULT_CHAMA_PORT);
        let database_url = env::var("CHAMA_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ CHAMA_DATABASE_URL is not set. Please set it to the URL for the chama ledger database.");
            String::default()
        });
        let platform_fee_bps = configure_platform_fee();
        let paystack = PaystackConfig::new_from_env_or_default();
        let signature_checks = parse_boolean_flag(env::var("CHAMA_PAYSTACK_SIGNATURE_CHECKS").ok(), true);
        if !signature_checks {
            warn!(
                "🚨️🚨️🚨️ Paystack webhook signature checks are DISABLED. Anyone can credit wallets on this server. Never \
                 run a production instance like this. 🚨️🚨️🚨️"
            );
        }
        let proxy = ProxyConfig::from_env_or_default();
        let payout_worker = PayoutWorkerConfig::from_env_or_default();
        let notification_webhook_url =
            env::var("CHAMA_NOTIFICATION_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty());
        match &notification_webhook_url {
            Some(url) => info!("🪛️ Notifications will be forwarded to {url}"),
            None => info!("🪛️ CHAMA_NOTIFICATION_WEBHOOK_URL is not set. Notifications are stored only."),
        }
        Self {
            host,
            port,
            database_url,
            platform_fee_bps,
            paystack,
            signature_checks,
            proxy,
            payout_worker,
            notification_webhook_url,
        }
    }
}

impl ProxyConfig {
    pub fn new(secret: &str) -> Self {
        Self { secret: Secret::new(secret.to_string()), ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let secret = env::var("CHAMA_PROXY_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CHAMA_PROXY_SECRET is not set. Every request to /api will be rejected until it is set to the \
                 secret shared with the auth proxy."
            );
            String::default()
        });
        let user_id_header = env::var("CHAMA_USER_ID_HEADER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_USER_ID_HEADER.to_string());
        Self { secret: Secret::new(secret), user_id_header }
    }
}

impl PayoutWorkerConfig {
    pub fn from_env_or_default() -> Self {
        let enabled = parse_boolean_flag(env::var("CHAMA_PAYOUT_WORKER").ok(), false);
        let interval = env_var_parsed::<u64>("CHAMA_PAYOUT_INTERVAL_SECS")
            .map_err(|e| warn!("🪛️ {e}. Using the default payout interval."))
            .ok()
            .flatten()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PAYOUT_INTERVAL);
        if enabled {
            info!("🪛️ The payout worker will run every {}s", interval.as_secs());
        } else {
            info!("🪛️ The payout worker is disabled. Set CHAMA_PAYOUT_WORKER=1 to push withdrawals out via Paystack.");
        }
        Self { enabled, interval }
    }
}

fn configure_platform_fee() -> u32 {
    match env_var_parsed::<u32>("CHAMA_PLATFORM_FEE_BPS") {
        Ok(Some(bps)) if bps <= 10_000 => bps,
        Ok(Some(bps)) => {
            warn!("🪛️ CHAMA_PLATFORM_FEE_BPS ({bps}) is more than 100%. Using {DEFAULT_PLATFORM_FEE_BPS} instead.");
            DEFAULT_PLATFORM_FEE_BPS
        },
        Ok(None) => {
            info!("🪛️ CHAMA_PLATFORM_FEE_BPS is not set. Using the default of {DEFAULT_PLATFORM_FEE_BPS} bps.");
            DEFAULT_PLATFORM_FEE_BPS
        },
        Err(e) => {
            warn!("🪛️ {e}. Using the default of {DEFAULT_PLATFORM_FEE_BPS} bps.");
            DEFAULT_PLATFORM_FEE_BPS
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn platform_fee_falls_back_to_the_default() {
        env::set_var("CHAMA_PLATFORM_FEE_BPS", "100");
        assert_eq!(configure_platform_fee(), 100);
        env::set_var("CHAMA_PLATFORM_FEE_BPS", "10001");
        assert_eq!(configure_platform_fee(), DEFAULT_PLATFORM_FEE_BPS);
        env::set_var("CHAMA_PLATFORM_FEE_BPS", "two percent");
        assert_eq!(configure_platform_fee(), DEFAULT_PLATFORM_FEE_BPS);
        env::remove_var("CHAMA_PLATFORM_FEE_BPS");
        assert_eq!(configure_platform_fee(), DEFAULT_PLATFORM_FEE_BPS);
    }

    #[test]
    fn proxy_config_uses_the_default_user_header() {
        let config = ProxyConfig::new("s3cret");
        assert_eq!(config.user_id_header, DEFAULT_USER_ID_HEADER);
        assert!(config.secret.matches(b"s3cret"));
        assert!(!config.secret.matches(b"s3cre"));
    }
}
