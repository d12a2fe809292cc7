//! Stateless pub-sub for ledger events.
//!
//! Ledger components publish events (a notification was written, a charge settled) and any number of subscribers
//! react to them. A handler only ever sees the event itself. Each event runs on its own task, so a slow sink cannot
//! hold up the ledger.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// The receiving end of an event channel. It runs until every [`EventProducer`] has been dropped, then waits for the
/// events still in flight.
pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    pub async fn start_handler(self) {
        let Self { mut receiver, sender, handler } = self;
        // Only producers may keep the channel open
        drop(sender);
        debug!("📬️ Event handler started");
        let mut in_flight = JoinSet::new();
        while let Some(event) = receiver.recv().await {
            let handler = Arc::clone(&handler);
            in_flight.spawn(async move { (handler)(event).await });
            // Reap whatever has already finished so the set does not grow without bound
            while let Some(done) = in_flight.try_join_next() {
                log_join_result(done);
            }
        }
        if !in_flight.is_empty() {
            debug!("📬️ All producers are gone. Waiting for {} event(s) to finish", in_flight.len());
        }
        while let Some(done) = in_flight.join_next().await {
            log_join_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event hook did not complete. {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event. Waits while the channel is full. If the handler is gone, the event is dropped and logged.
    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            warn!("📬️ Event dropped. Its handler is no longer running");
        }
    }
}
