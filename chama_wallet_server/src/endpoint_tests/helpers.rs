use actix_web::{body, http::StatusCode, test, test::TestRequest, App};
use chama_common::Secret;
use chama_ledger::{
    events::EventProducers,
    test_utils::{new_test_database, seed_chama, MockGateway, TestChama},
    SqliteDatabase,
};
use log::debug;
use paystack_tools::helpers::calculate_signature;
use serde_json::Value;

use crate::{
    config::{
        ProxyConfig,
        DEFAULT_PLATFORM_FEE_BPS,
        DEFAULT_USER_ID_HEADER,
        PAYSTACK_SIGNATURE_HEADER,
        PROXY_SECRET_HEADER,
    },
    server::{configure_app_data, configure_routes},
};

// Test-only secrets. DO NOT re-use these anywhere.
pub const PROXY_SECRET: &str = "proxy-secret-for-endpoint-tests";
pub const WEBHOOK_SECRET: &str = "sk_test_endpoint_tests";

/// A seeded chama behind a fully configured app, with the mock gateway standing in for Paystack.
pub struct TestServer {
    pub db: SqliteDatabase,
    pub gateway: MockGateway,
    pub seed: TestChama,
}

impl TestServer {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let db = new_test_database().await;
        let seed = seed_chama(&db).await;
        Self { db, gateway: MockGateway::new(), seed }
    }

    pub fn chama_id(&self) -> i64 {
        self.seed.chama.id
    }

    /// Sends the request through the whole app, middleware included, and returns the status and JSON body.
    /// Bodies that are not JSON come back as a JSON string.
    pub async fn send(&self, req: TestRequest) -> (StatusCode, Value) {
        let app = App::new()
            .configure(configure_app_data(
                self.db.clone(),
                self.gateway.clone(),
                EventProducers::default(),
                DEFAULT_PLATFORM_FEE_BPS,
            ))
            .configure(configure_routes::<SqliteDatabase, MockGateway>(
                ProxyConfig::new(PROXY_SECRET),
                Secret::new(WEBHOOK_SECRET.to_string()),
                true,
            ));
        let service = test::init_service(app).await;
        let res = match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => res.map_into_boxed_body().into_parts().1,
            Err(e) => {
                debug!("Request was rejected by middleware. {e}");
                e.error_response()
            },
        };
        let status = res.status();
        let bytes = body::to_bytes(res.into_body()).await.unwrap_or_default();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    pub async fn get_as(&self, user_id: &str, path: &str) -> (StatusCode, Value) {
        self.send(as_user(TestRequest::get().uri(path), user_id)).await
    }

    pub async fn post_as(&self, user_id: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(as_user(TestRequest::post().uri(path), user_id).set_json(body)).await
    }

    pub async fn post_webhook(&self, body: &str, signature: Option<String>) -> (StatusCode, Value) {
        let mut req = TestRequest::post()
            .uri("/paystack/webhook")
            .insert_header(("content-type", "application/json"))
            .set_payload(body.to_string());
        if let Some(signature) = signature {
            req = req.insert_header((PAYSTACK_SIGNATURE_HEADER, signature));
        }
        self.send(req).await
    }
}

/// Adds the headers the auth proxy would add for `user_id`.
pub fn as_user(req: TestRequest, user_id: &str) -> TestRequest {
    req.insert_header((PROXY_SECRET_HEADER, PROXY_SECRET)).insert_header((DEFAULT_USER_ID_HEADER, user_id))
}

pub fn sign(body: &str) -> String {
    calculate_signature(WEBHOOK_SECRET, body.as_bytes())
}

pub fn charge_success(reference: &str, amount_in_cents: i64) -> String {
    format!(
        r#"{{"event":"charge.success","data":{{"reference":"{reference}","amount":{amount_in_cents},"status":"success",
            "gateway_response":"Approved","paid_at":"2024-10-15T09:30:00.000Z"}}}}"#
    )
}
