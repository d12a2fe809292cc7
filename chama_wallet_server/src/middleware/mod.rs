mod hmac;
mod proxy_auth;

pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService};
pub use proxy_auth::{ProxyAuthMiddlewareFactory, ProxyAuthMiddlewareService};
