//! # Chama wallet server
//! This crate hosts the HTTP surface of the chama wallet ledger. It is responsible for:
//! * Accepting wallet operations, contributions and loan disbursements from authenticated members and handing them
//!   to the ledger API.
//! * Opening and verifying Paystack payment sessions.
//! * Receiving Paystack webhooks, checking their signatures, and settling the payments they describe.
//! * Optionally, running the payout worker that pushes pending withdrawals out through Paystack.
//!
//! ## Authentication
//! The server does not authenticate users itself. It sits behind a proxy that verifies the user's session and
//! forwards the user id in a header, together with a shared secret. See [`middleware::ProxyAuthMiddlewareFactory`].
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Member routes. See [`routes`].
//! * `/paystack/webhook`: The Paystack webhook. Always answers 200.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod payout_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
