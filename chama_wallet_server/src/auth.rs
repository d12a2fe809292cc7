//! The identity of the caller, as established by the upstream auth proxy.
//!
//! [`crate::middleware::ProxyAuthMiddlewareFactory`] checks the proxy secret and stores an [`AuthenticatedUser`] in
//! the request extensions. Handlers take `AuthenticatedUser` as an argument to get at it.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl AuthenticatedUser {
    pub fn new<S: Into<String>>(user_id: S) -> Self {
        Self { user_id: user_id.into() }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        let result = user.ok_or_else(|| {
            warn!("💻️ {} was routed without passing the proxy auth check", req.path());
            ServerError::Unauthenticated("No authenticated user for this request".into())
        });
        ready(result)
    }
}
