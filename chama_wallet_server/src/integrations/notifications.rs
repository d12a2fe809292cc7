use std::time::Duration;

use chama_ledger::events::{EventHandlers, EventHooks, NotificationEvent, PaymentSettledEvent};
use futures::future::BoxFuture;
use log::*;
use reqwest::Client;

use crate::errors::ServerError;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 100;
const SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the server's event handlers.
///
/// Every notification is already stored in the ledger's outbox before it is published. If `sink_url` is given, each
/// one is also POSTed there as JSON, on a best-effort basis: failed deliveries are logged and dropped. Settled
/// payments are logged.
pub fn create_event_handlers(sink_url: Option<&str>) -> Result<EventHandlers, ServerError> {
    let mut hooks = EventHooks::default();
    if let Some(url) = sink_url {
        let client = Client::builder()
            .timeout(SINK_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create the notification client. {e}")))?;
        let url = url.to_string();
        hooks.on_notification(move |ev| forward_notification(client.clone(), url.clone(), ev));
    }
    hooks.on_payment_settled(log_settlement);
    Ok(EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks))
}

fn forward_notification(client: Client, url: String, ev: NotificationEvent) -> BoxFuture<'static, ()> {
    let notification = ev.notification;
    Box::pin(async move {
        let result = client.post(&url).json(&notification).send().await.and_then(|r| r.error_for_status());
        match result {
            Ok(_) => debug!(
                "📬️ Notification #{} ({}) forwarded for {}",
                notification.id, notification.notification_type, notification.user_id
            ),
            Err(e) => warn!("📬️ Could not forward notification #{} to {url}. {e}", notification.id),
        }
    })
}

fn log_settlement(ev: PaymentSettledEvent) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let PaymentSettledEvent { payment, fee, net } = ev;
        info!(
            "📬️ Payment {} ({}) settled for {}. {net} credited, {fee} platform fee.",
            payment.reference, payment.purpose, payment.user_id
        );
    })
}
