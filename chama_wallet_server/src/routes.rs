//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! All `/api` routes sit behind [`crate::middleware::ProxyAuthMiddlewareFactory`], so the caller is always known
//! (see [`AuthenticatedUser`]). Routes that act within a chama first resolve the caller's membership of that chama
//! into a [`RequestContext`]; non-members are turned away with a 403.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every ledger and gateway call is async, so keep it that way.
use actix_web::{get, web, HttpResponse, Responder};
use chama_ledger::{
    traits::{LedgerDatabase, LedgerQueries, PaymentDatabase, PaymentGateway},
    CallbackApi,
    CallbackOutcome,
    LockApi,
    PaymentRequest,
    PaymentSessionApi,
    QueryApi,
    RequestContext,
    TransferApi,
    WalletApi,
    WalletRequest,
    WalletResponse,
};
use log::*;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{
        ChamaParams,
        ContributionRequest,
        ContributionResponse,
        DisburseLoanRequest,
        JsonResponse,
        LoanResponse,
        PageParams,
        PaymentSessionResponse,
    },
    errors::ServerError,
    integrations::paystack::parse_webhook,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ ; $gateway:path) => {
        paste::paste! { pub struct [<$name:camel Route>]<B, G>(core::marker::PhantomData<fn() -> (B, G)>);}
        paste::paste! { impl<B, G> [<$name:camel Route>]<B, G> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> (B, G)>)
            }
        }}
        paste::paste! { impl<B, G> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B, G>
        where
            B: $($bounds +)+ 'static,
            G: $gateway + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B, G>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

async fn member_context<B>(
    api: &WalletApi<B>,
    user: &AuthenticatedUser,
    chama_id: i64,
) -> Result<RequestContext, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let ctx = api.context_for(&user.user_id, chama_id).await?;
    trace!("💻️ {} is acting as member #{} ({}) of chama #{chama_id}", user.user_id, ctx.member_id, ctx.role);
    Ok(ctx)
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(wallet_operation => Post "/wallet" impl LedgerDatabase, LedgerQueries);
/// Route handler for wallet operations: `topup`, `withdraw`, `send`, `lock` and `unlock`.
///
/// The body is a [`WalletRequest`], e.g.
/// ```json
/// { "operation": "withdraw", "chamaId": 3, "amount": 700, "payoutMethod": "mpesa",
///   "payoutDetails": { "phoneNumber": "254712345678" } }
/// ```
/// Amounts are in shillings. On success, the caller gets their new balances back. For withdrawals, the reply also
/// carries the payout reference.
pub async fn wallet_operation<B>(
    user: AuthenticatedUser,
    body: web::Json<WalletRequest>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let request = body.into_inner();
    debug!("💻️ POST wallet operation for {} in chama #{}", user.user_id, request.chama_id);
    let response: WalletResponse = api.execute(&user.user_id, request).await.map_err(|e| {
        debug!("💻️ Wallet operation for {} failed. {e}", user.user_id);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initialize_payment => Post "/payments/initialize" impl PaymentDatabase, LedgerQueries; PaymentGateway);
/// Opens a checkout session with the payment gateway. The payer is redirected to `authorizationUrl` to pay.
///
/// The money is credited when the gateway confirms the charge, either through the webhook or through
/// `/api/payments/verify/{reference}`.
pub async fn initialize_payment<B, G>(
    user: AuthenticatedUser,
    body: web::Json<PaymentRequest>,
    api: web::Data<PaymentSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentDatabase + LedgerQueries,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST initialize {} payment of {} for {}", request.purpose, request.amount, user.user_id);
    let session = api.initialize(&user.user_id, request).await?;
    Ok(HttpResponse::Ok().json(PaymentSessionResponse::new(session)))
}

route!(verify_payment => Get "/payments/verify/{reference}" impl PaymentDatabase, LedgerQueries; PaymentGateway);
/// Asks the gateway for the state of one of the caller's payments, and applies the result if the webhook has not
/// done so yet.
pub async fn verify_payment<B, G>(
    user: AuthenticatedUser,
    path: web::Path<String>,
    api: web::Data<PaymentSessionApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentDatabase + LedgerQueries,
    G: PaymentGateway,
{
    let reference = path.into_inner();
    debug!("💻️ GET verify payment {reference} for {}", user.user_id);
    let payment = api.verify(&user.user_id, &reference).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(my_payments => Get "/payments" impl LedgerQueries);
pub async fn my_payments<B: LedgerQueries>(
    user: AuthenticatedUser,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_payments for {}", user.user_id);
    let payments = api.payments(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

//----------------------------------------------   Loans  ----------------------------------------------------
route!(disburse_loan => Post "/loans/disburse" impl LedgerDatabase, LedgerQueries);
/// Pays an approved loan out of the chama's central wallet into the borrower's MGR wallet. Officers only.
pub async fn disburse_loan<B>(
    user: AuthenticatedUser,
    body: web::Json<DisburseLoanRequest>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<TransferApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let request = body.into_inner();
    debug!("💻️ POST disburse loan #{} by {}", request.loan_id, user.user_id);
    let ctx = member_context(&wallets, &user, request.chama_id).await?;
    let receipt = api.disburse_loan_funds(&ctx, request.loan_id, request.amount, &request.destination).await?;
    let message = format!("{} sent to {}", request.amount, receipt.borrower.name());
    Ok(HttpResponse::Ok().json(LoanResponse::from_receipt(message, receipt)))
}

route!(approve_loan => Post "/loans/{loan_id}/approve" impl LedgerDatabase, LedgerQueries);
pub async fn approve_loan<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    body: web::Json<ChamaParams>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<TransferApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let loan_id = path.into_inner();
    debug!("💻️ POST approve loan #{loan_id} by {}", user.user_id);
    let ctx = member_context(&wallets, &user, body.chama_id).await?;
    let receipt = api.approve_loan(&ctx, loan_id).await?;
    let message = format!("Loan #{loan_id} approved for {}", receipt.borrower.name());
    Ok(HttpResponse::Ok().json(LoanResponse::from_receipt(message, receipt)))
}

//----------------------------------------------   Contributions  ----------------------------------------------------
route!(record_contribution => Post "/contributions" impl LedgerDatabase, LedgerQueries);
/// Records a contribution the caller made outside the gateway. It is credited to their savings.
pub async fn record_contribution<B>(
    user: AuthenticatedUser,
    body: web::Json<ContributionRequest>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<TransferApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let request = body.into_inner();
    debug!("💻️ POST contribution of {} by {} to chama #{}", request.amount, user.user_id, request.chama_id);
    let ctx = member_context(&wallets, &user, request.chama_id).await?;
    let amount = request.amount;
    let receipt = api.record_contribution(&ctx, request.into()).await?;
    Ok(HttpResponse::Ok().json(ContributionResponse {
        success: true,
        message: format!("Contribution of {amount} recorded"),
        new_balances: receipt.member.balances(),
        reference: receipt.reference,
    }))
}

//----------------------------------------------   Members  ----------------------------------------------------
route!(member_overview => Get "/members/{chama_id}/me" impl LedgerDatabase, LedgerQueries);
/// The caller's balances in the chama, the chama's central wallet, and the caller's personal wallet.
pub async fn member_overview<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let chama_id = path.into_inner();
    debug!("💻️ GET member_overview for {} in chama #{chama_id}", user.user_id);
    let ctx = member_context(&wallets, &user, chama_id).await?;
    let overview = api.member_overview(&ctx).await?;
    Ok(HttpResponse::Ok().json(overview))
}

route!(my_contributions => Get "/members/{chama_id}/me/contributions" impl LedgerDatabase, LedgerQueries);
pub async fn my_contributions<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let ctx = member_context(&wallets, &user, path.into_inner()).await?;
    let contributions = api.contributions(&ctx).await?;
    Ok(HttpResponse::Ok().json(contributions))
}

route!(my_payouts => Get "/members/{chama_id}/me/payouts" impl LedgerDatabase, LedgerQueries);
pub async fn my_payouts<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let ctx = member_context(&wallets, &user, path.into_inner()).await?;
    let payouts = api.payouts(&ctx).await?;
    Ok(HttpResponse::Ok().json(payouts))
}

route!(chama_members => Get "/members/{chama_id}" impl LedgerDatabase, LedgerQueries);
pub async fn chama_members<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let ctx = member_context(&wallets, &user, path.into_inner()).await?;
    let members = api.members(&ctx).await?;
    Ok(HttpResponse::Ok().json(members))
}

route!(deactivate_member => Post "/members/{chama_id}/{member_id}/deactivate" impl LedgerDatabase, LedgerQueries);
/// Soft-deletes a member. Admins and chairmen only.
pub async fn deactivate_member<B>(
    user: AuthenticatedUser,
    path: web::Path<(i64, i64)>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<LockApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let (chama_id, member_id) = path.into_inner();
    info!("💻️ POST deactivate member #{member_id} of chama #{chama_id} by {}", user.user_id);
    let ctx = member_context(&wallets, &user, chama_id).await?;
    let receipt = api.deactivate_member(&ctx, member_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{} has been deactivated", receipt.member.name()))))
}

//----------------------------------------------   Audit  ----------------------------------------------------
route!(audit_log => Get "/audit/{chama_id}" impl LedgerDatabase, LedgerQueries);
/// The chama's audit trail, newest first. Admins, chairmen and treasurers only.
pub async fn audit_log<B>(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    query: web::Query<PageParams>,
    wallets: web::Data<WalletApi<B>>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + LedgerQueries,
{
    let chama_id = path.into_inner();
    debug!("💻️ GET audit_log for chama #{chama_id} by {}", user.user_id);
    let ctx = member_context(&wallets, &user, chama_id).await?;
    let entries = api.audit_log(&ctx, query.limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(my_notifications => Get "/notifications" impl LedgerQueries);
pub async fn my_notifications<B: LedgerQueries>(
    user: AuthenticatedUser,
    query: web::Query<PageParams>,
    api: web::Data<QueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_notifications for {}", user.user_id);
    let notifications = api.notifications(&user.user_id, query.limit).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

//----------------------------------------------   Paystack  ----------------------------------------------------
route!(paystack_webhook => Post "/webhook" impl PaymentDatabase);
/// The Paystack webhook. Signatures are checked by [`crate::middleware::HmacMiddlewareFactory`] before this runs.
///
/// Webhook responses must always be in 200 range, otherwise Paystack will retry. Every event that could be read is
/// acknowledged with the same body. What happened to it is only logged.
pub async fn paystack_webhook<B: PaymentDatabase>(body: web::Bytes, api: web::Data<CallbackApi<B>>) -> HttpResponse {
    let event = match parse_webhook(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("📞️ Could not read Paystack webhook payload. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not read webhook payload"));
        },
    };
    trace!("📞️ Received Paystack {:?} event for {}", event.kind, event.reference);
    match api.process_event(event).await {
        CallbackOutcome::Settled { reference, net, .. } => info!("📞️ Webhook settled {reference}. {net} credited"),
        CallbackOutcome::Failed { reference } => info!("📞️ Webhook marked {reference} as failed"),
        CallbackOutcome::Duplicate { reference } => debug!("📞️ Webhook for {reference} was already processed"),
        CallbackOutcome::UnknownReference { reference } => warn!("📞️ Webhook for unknown reference {reference}"),
        CallbackOutcome::Unapplied { reference, reason } => {
            warn!("📞️ Webhook for {reference} acknowledged but not applied. {reason}")
        },
        CallbackOutcome::Ignored { event } => debug!("📞️ Ignored {event} webhook"),
    }
    HttpResponse::Ok().json(JsonResponse::success("Webhook received"))
}
