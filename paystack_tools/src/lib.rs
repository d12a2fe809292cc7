//! A minimal client for the parts of the Paystack REST API that the chama wallet needs: payment sessions
//! (initialize and verify), transfer recipients and transfers, and webhook signature checks.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::PaystackApi;
pub use config::PaystackConfig;
pub use data_objects::{
    ChargeData,
    InitializeTransaction,
    InitializedTransaction,
    NewTransfer,
    NewTransferRecipient,
    PaystackResponse,
    Transfer,
    TransferRecipient,
    VerifiedTransaction,
    WebhookEvent,
};
pub use error::PaystackApiError;
