//! # Chama ledger public API
//!
//! The `ledger_api` module exposes the programmatic API of the ledger. Each API is a thin, validating layer over a
//! storage backend that implements the traits in [`crate::traits`]:
//!
//! * [`transfer_api`] moves money between a member's buckets, between members, and from the central wallet to
//!   borrowers.
//! * [`lock_api`] manages withdrawal locks and member deactivation. Only admins and chairmen may use it.
//! * [`callback_api`] ingests gateway charge events, idempotently.
//! * [`payment_session_api`] opens checkout sessions with the gateway and reconciles them by polling.
//! * [`payout_api`] pushes pending external withdrawals out through the gateway.
//! * [`wallet_api`] dispatches the tagged wallet operations that arrive over HTTP.
//! * [`query_api`] provides read-only access to balances, audit trails and notifications.
//!
//! Every API that commits something user-facing publishes a [`crate::events::NotificationEvent`] once the
//! transaction has committed.
//!
//! ```rust,ignore
//! use chama_ledger::{events::EventProducers, RequestContext, SqliteDatabase, TransferApi};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = TransferApi::new(db, EventProducers::default());
//! let receipt = api.top_up(&ctx, Cents::from_shillings(400)).await?;
//! ```

mod context;

pub mod callback_api;
pub mod lock_api;
pub mod payment_session_api;
pub mod payout_api;
pub mod query_api;
pub mod transfer_api;
pub mod wallet_api;

use chama_common::Cents;
pub use context::RequestContext;

use crate::traits::LedgerError;

pub(crate) fn ensure_positive(amount: Cents) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::Validation("Amount must be greater than zero".into()))
    }
}
