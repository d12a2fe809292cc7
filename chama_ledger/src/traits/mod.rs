//! # Ledger backend contracts
//!
//! This module defines the interfaces that storage backends implement in order to act as a chama ledger, as well as
//! the seam to the external payment gateway.
//!
//! * [`LedgerDatabase`] holds the balance-affecting operations. Each method is one atomic unit of work: the balance
//!   updates, the audit entry and any notification outbox row commit together or not at all.
//! * [`PaymentDatabase`] tracks payment sessions with the gateway, settles them into the ledger, and tracks payouts.
//! * [`LedgerQueries`] provides read-only access to members, wallets, loans, the audit log and notifications.
//! * [`ChamaManagement`] creates chamas, members and loan applications.
//! * [`PaymentGateway`] is implemented by gateway clients (e.g. Paystack), not by databases.
mod chama_management;
mod data_objects;
mod ledger_database;
mod ledger_queries;
mod payment_database;
mod payment_gateway;

pub use chama_management::ChamaManagement;
pub use data_objects::{
    ChargeFailure,
    ChargeSettlement,
    LoanReceipt,
    NewContribution,
    PayoutReceipt,
    SettlementReceipt,
    TransferReceipt,
};
pub use ledger_database::{LedgerDatabase, LedgerError};
pub use ledger_queries::LedgerQueries;
pub use payment_database::PaymentDatabase;
pub use payment_gateway::{
    ChargeStatus,
    GatewayCharge,
    GatewayError,
    GatewayEvent,
    GatewayEventKind,
    GatewaySession,
    PaymentGateway,
    PayoutRequest,
    SessionRequest,
    TransferConfirmation,
};
