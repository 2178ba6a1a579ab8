//! The dispatcher is the single consumer of the notification queue. Each
//! message is handed to every registered notifier, one after another.

use crate::core::Message;
use crate::registry::NotifierRegistry;
use crate::task_manager::wait_for_shutdown;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// The `Dispatcher` actor.
pub struct Dispatcher {
    notifiers: Arc<NotifierRegistry>,
    queue_rx: async_channel::Receiver<Message>,
}

impl Dispatcher {
    /// Creates a new `Dispatcher`.
    pub fn new(notifiers: Arc<NotifierRegistry>, queue_rx: async_channel::Receiver<Message>) -> Self {
        Self {
            notifiers,
            queue_rx,
        }
    }

    /// Runs the dispatcher's main loop until shutdown or until every producer
    /// is gone. Messages still queued at shutdown are dropped.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(notifiers = self.notifiers.len(), "Dispatcher started.");
        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    let dropped = self.queue_rx.len();
                    if dropped > 0 {
                        warn!(dropped, "Dispatcher shutting down with undelivered messages.");
                    }
                    info!("Dispatcher received shutdown signal.");
                    break;
                }
                result = self.queue_rx.recv() => {
                    match result {
                        Ok(message) => {
                            self.dispatch(&message).await;
                        }
                        Err(_) => {
                            info!("Notification queue closed. Shutting down Dispatcher.");
                            break;
                        }
                    }
                }
            }
        }
        info!("Dispatcher finished.");
    }

    /// Hands `message` to every notifier. A failing notifier is logged and
    /// does not stop delivery to the others.
    ///
    /// # Returns
    /// The number of notifiers that accepted the message.
    pub async fn dispatch(&self, message: &Message) -> usize {
        let mut delivered = 0;
        for (name, notifier) in self.notifiers.iter() {
            match notifier.notify(message).await {
                Ok(()) => {
                    metrics::counter!("notifications_sent_total", "notifier" => name.to_string())
                        .increment(1);
                    debug!(notifier = name, "Message delivered.");
                    delivered += 1;
                }
                Err(e) => {
                    metrics::counter!("notifications_failed_total", "notifier" => name.to_string())
                        .increment(1);
                    error!(notifier = name, error = %e, "Failed to deliver message.");
                }
            }
        }
        delivered
    }
}
