//! Proxy authentication middleware.
//!
//! User sessions are verified by an upstream proxy, which forwards the user id in a configurable header
//! (`x-chama-user-id` by default) and proves that the request came through it with a shared secret in the
//! `x-chama-proxy-secret` header.
//!
//! Requests with a missing or wrong secret, or without a user id, are rejected with 401 before reaching any handler.
//! Otherwise an [`AuthenticatedUser`] is attached to the request.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{
    auth::AuthenticatedUser,
    config::{ProxyConfig, PROXY_SECRET_HEADER},
    errors::ServerError,
};

pub struct ProxyAuthMiddlewareFactory {
    config: ProxyConfig,
}

impl ProxyAuthMiddlewareFactory {
    pub fn new(config: ProxyConfig) -> Self {
        ProxyAuthMiddlewareFactory { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ProxyAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = ProxyAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ProxyAuthMiddlewareService { config: self.config.clone(), service: Rc::new(service) }))
    }
}

pub struct ProxyAuthMiddlewareService<S> {
    config: ProxyConfig,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ProxyAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let user = authenticate(&self.config, &req);
        Box::pin(async move {
            let user = user?;
            trace!("💻️ Request to {} from user {}", req.path(), user.user_id);
            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}

fn authenticate(config: &ProxyConfig, req: &ServiceRequest) -> Result<AuthenticatedUser, ServerError> {
    // An unset secret must never match an empty header
    if config.secret.is_empty() {
        warn!("💻️ CHAMA_PROXY_SECRET is not configured. Rejecting request to {}", req.path());
        return Err(ServerError::Unauthenticated("The server is not accepting requests".into()));
    }
    let secret = req.headers().get(PROXY_SECRET_HEADER).map(|v| v.as_bytes()).unwrap_or_default();
    if !config.secret.matches(secret) {
        warn!("💻️ Request to {} did not carry a valid proxy secret. Denying access.", req.path());
        return Err(ServerError::Unauthenticated("Invalid or missing proxy credentials".into()));
    }
    let user_id = req
        .headers()
        .get(config.user_id_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            warn!("💻️ Request to {} had a valid proxy secret but no user id", req.path());
            ServerError::Unauthenticated("No user id was supplied".into())
        })?;
    Ok(AuthenticatedUser::new(user_id))
}
