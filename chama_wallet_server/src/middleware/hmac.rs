//! HMAC middleware for Actix Web.
//!
//! Paystack signs every webhook with HMAC-SHA512 over the raw request body, keyed by the account's secret key, and
//! sends the hex digest in the `x-paystack-signature` header.
//!
//! Wrap the webhook scope in this middleware to drop unsigned or forged calls before they reach the handler.
//! Paystack retries any webhook that does not get a 2xx answer, so rejected calls are still answered with `200 OK`
//! and a `{"success": false}` body.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpResponse,
};
use chama_common::Secret;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use paystack_tools::helpers::verify_signature;

use crate::data_objects::JsonResponse;

pub struct HmacMiddlewareFactory {
    hmac_header: String,
    key: Secret<String>,
    // If false, then the middleware will not check the HMAC signature and always allow the call
    enabled: bool,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        HmacMiddlewareFactory { hmac_header: hmac_header.into(), key, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService {
            hmac_header: self.hmac_header.clone(),
            key: self.key.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct HmacMiddlewareService<S> {
    hmac_header: String,
    key: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<EitherBody<B>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.key.reveal().clone();
        let hmac_header = self.hmac_header.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("📞️ Checking webhook signature");
            if !enabled {
                trace!("📞️ Signature checks are disabled. Allowing request.");
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }
            let data = match req.extract::<web::Bytes>().await {
                Ok(data) => data,
                Err(e) => {
                    warn!("📞️ Failed to extract webhook body: {e:?}");
                    return Ok(reject(req, "Failed to read request body."));
                },
            };
            let signature = req.headers().get(&hmac_header).and_then(|v| v.to_str().ok()).map(str::to_string);
            let Some(signature) = signature else {
                warn!("📞️ No signature found on webhook call. Ignoring it.");
                return Ok(reject(req, "No signature found."));
            };
            if secret.is_empty() || !verify_signature(&secret, data.as_ref(), &signature) {
                warn!("📞️ Invalid signature on webhook call. Ignoring it.");
                return Ok(reject(req, "Invalid signature."));
            }
            trace!("📞️ Webhook signature ✅️");
            req.set_payload(bytes_to_payload(data));
            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}

fn reject<B>(req: ServiceRequest, message: &str) -> ServiceResponse<EitherBody<B>> {
    let res = HttpResponse::Ok().json(JsonResponse::failure(message));
    req.into_response(res).map_into_right_body()
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
