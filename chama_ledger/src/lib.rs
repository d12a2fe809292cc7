//! Chama Ledger
//!
//! The chama ledger keeps the books of a chama, a member-run savings group. Every member holds two balances in
//! their chama: savings, built up from contributions, and a spendable "MGR" wallet. The chama itself holds a
//! central wallet that funds loans.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`] and the backend [`traits`]). Every balance-affecting operation is a single database
//!    transaction whose first statement is a guarded `UPDATE`, so concurrent requests against the same member
//!    serialise on the database and can never overdraw a balance. You should not need to call the database
//!    directly. The exception is the data types, which are defined in [`db_types`] and are public.
//! 2. The ledger public API ([`mod@ledger_api`]). It validates requests, checks roles, and publishes events after
//!    every commit. It is also where gateway events (webhooks and verification polls) are applied, idempotently.
//! 3. Events ([`events`]). Notifications and settled payments are published to any number of async hooks, e.g. to
//!    forward notifications to a delivery service.
//!
//! The payment gateway is reached through the [`traits::PaymentGateway`] seam. This crate does not depend on any
//! particular gateway.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ledger_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use ledger_api::{
    callback_api::{CallbackApi, CallbackOutcome},
    lock_api::LockApi,
    payment_session_api::{PaymentRequest, PaymentSession, PaymentSessionApi},
    payout_api::{PayoutApi, PayoutRunSummary},
    query_api::{MemberOverview, QueryApi},
    transfer_api::TransferApi,
    wallet_api::{WalletApi, WalletOperation, WalletRequest, WalletResponse},
    RequestContext,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{LedgerError, PaymentGateway};
