use std::time::Duration;

use chama_ledger::{events::EventProducers, PayoutApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

use crate::integrations::paystack::PaystackGateway;

/// The most payouts pushed to the gateway in one run.
pub const PAYOUT_BATCH_SIZE: i64 = 50;

/// Starts the payout worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_payout_worker(
    db: SqliteDatabase,
    gateway: PaystackGateway,
    producers: EventProducers,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = PayoutApi::new(db, gateway, producers);
        info!("🔄️ Payout worker started");
        loop {
            timer.tick().await;
            trace!("🔄️ Running payout job");
            match api.process_pending_payouts(PAYOUT_BATCH_SIZE).await {
                Ok(summary) if summary == Default::default() => trace!("🔄️ No pending payouts"),
                Ok(summary) => info!(
                    "🔄️ Payout run complete. {} completed, {} failed and refunded, {} still pending",
                    summary.completed, summary.failed, summary.pending
                ),
                Err(e) => error!("🔄️ Error running payout job: {e}"),
            }
        }
    })
}
