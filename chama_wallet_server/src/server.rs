use std::time::Duration;

use actix_web::{
    dev::Server,
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpRequest,
    HttpServer,
};
use chama_common::Secret;
use chama_ledger::{
    events::EventProducers,
    traits::{LedgerDatabase, LedgerQueries, PaymentDatabase, PaymentGateway},
    CallbackApi,
    LockApi,
    PaymentSessionApi,
    QueryApi,
    SqliteDatabase,
    TransferApi,
    WalletApi,
};
use log::*;

use crate::{
    config::{ProxyConfig, ServerConfig, PAYSTACK_SIGNATURE_HEADER},
    errors::ServerError,
    integrations::{notifications::create_event_handlers, paystack::PaystackGateway},
    middleware::{HmacMiddlewareFactory, ProxyAuthMiddlewareFactory},
    payout_worker::start_payout_worker,
    routes::{
        health,
        ApproveLoanRoute,
        AuditLogRoute,
        ChamaMembersRoute,
        DeactivateMemberRoute,
        DisburseLoanRoute,
        InitializePaymentRoute,
        MemberOverviewRoute,
        MyContributionsRoute,
        MyNotificationsRoute,
        MyPaymentsRoute,
        MyPayoutsRoute,
        PaystackWebhookRoute,
        RecordContributionRoute,
        VerifyPaymentRoute,
        WalletOperationRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let gateway = PaystackGateway::new(config.paystack.clone())?;
    let handlers = create_event_handlers(config.notification_webhook_url.as_deref())?;
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if config.payout_worker.enabled {
        let interval = config.payout_worker.interval;
        let _handle = start_payout_worker(db.clone(), gateway.clone(), producers.clone(), interval);
    }
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: PaystackGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let fee_bps = config.platform_fee_bps;
    let proxy = config.proxy.clone();
    let webhook_secret = config.paystack.secret_key.clone();
    let signature_checks = config.signature_checks;
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("chama::access_log"))
            .configure(configure_app_data(db.clone(), gateway.clone(), producers.clone(), fee_bps))
            .configure(configure_routes::<SqliteDatabase, PaystackGateway>(
                proxy.clone(),
                webhook_secret.clone(),
                signature_checks,
            ))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the ledger APIs that the route handlers pull out of the app data, and makes extractor failures
/// answer with the same JSON error body as everything else.
pub fn configure_app_data<B, G>(
    db: B,
    gateway: G,
    producers: EventProducers,
    fee_bps: u32,
) -> impl FnOnce(&mut ServiceConfig)
where
    B: LedgerDatabase + LedgerQueries + PaymentDatabase + 'static,
    G: PaymentGateway + 'static,
{
    move |cfg| {
        let callbacks = CallbackApi::new(db.clone(), producers.clone(), fee_bps);
        let payments = PaymentSessionApi::new(gateway, callbacks.clone());
        cfg.app_data(web::Data::new(WalletApi::new(db.clone(), producers.clone())))
            .app_data(web::Data::new(TransferApi::new(db.clone(), producers.clone())))
            .app_data(web::Data::new(LockApi::new(db.clone(), producers)))
            .app_data(web::Data::new(QueryApi::new(db)))
            .app_data(web::Data::new(payments))
            .app_data(web::Data::new(callbacks))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .app_data(web::QueryConfig::default().error_handler(query_error));
    }
}

/// Mounts `/health`, the proxy-authenticated `/api` scope, and the signed `/paystack` webhook scope.
pub fn configure_routes<B, G>(
    proxy: ProxyConfig,
    webhook_secret: Secret<String>,
    signature_checks: bool,
) -> impl FnOnce(&mut ServiceConfig)
where
    B: LedgerDatabase + LedgerQueries + PaymentDatabase + 'static,
    G: PaymentGateway + 'static,
{
    move |cfg| {
        let api_scope = web::scope("/api")
            .wrap(ProxyAuthMiddlewareFactory::new(proxy))
            .service(WalletOperationRoute::<B>::new())
            .service(InitializePaymentRoute::<B, G>::new())
            .service(VerifyPaymentRoute::<B, G>::new())
            .service(MyPaymentsRoute::<B>::new())
            .service(DisburseLoanRoute::<B>::new())
            .service(ApproveLoanRoute::<B>::new())
            .service(RecordContributionRoute::<B>::new())
            .service(MemberOverviewRoute::<B>::new())
            .service(MyContributionsRoute::<B>::new())
            .service(MyPayoutsRoute::<B>::new())
            .service(ChamaMembersRoute::<B>::new())
            .service(DeactivateMemberRoute::<B>::new())
            .service(AuditLogRoute::<B>::new())
            .service(MyNotificationsRoute::<B>::new());
        let paystack_scope = web::scope("/paystack")
            .wrap(HmacMiddlewareFactory::new(PAYSTACK_SIGNATURE_HEADER, webhook_secret, signature_checks))
            .service(PaystackWebhookRoute::<B>::new());
        cfg.service(health).service(api_scope).service(paystack_scope);
    }
}

fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Invalid JSON body for {}. {err}", req.path());
    ServerError::InvalidRequestBody(err.to_string()).into()
}

fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Invalid path {}. {err}", req.path());
    ServerError::InvalidRequestPath(err.to_string()).into()
}

fn query_error(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("💻️ Invalid query string for {}. {err}", req.path());
    ServerError::InvalidRequestPath(err.to_string()).into()
}
