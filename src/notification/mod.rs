//! Delivery of messages to the registered notification channels.
//!
//! Jobs push messages into a bounded [`NotificationQueue`]; a single
//! [`Dispatcher`] drains it and hands every message to each notifier in turn.
//! A full queue makes producers wait rather than dropping messages.
pub mod dispatcher;
pub mod formspree;
pub mod log;

pub use dispatcher::Dispatcher;
pub use formspree::FormspreeNotifier;
pub use log::LogNotifier;

use crate::core::Message;
use thiserror::Error;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// The dispatcher side of the queue is gone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("notification queue is closed")]
pub struct QueueClosed;

/// Producer handle of the bounded notification queue.
#[derive(Clone, Debug)]
pub struct NotificationQueue {
    tx: async_channel::Sender<Message>,
}

impl NotificationQueue {
    /// Creates a queue holding at most `capacity` messages (at least one).
    pub fn bounded(capacity: usize) -> (Self, async_channel::Receiver<Message>) {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues a message, waiting while the queue is full.
    pub async fn push(&self, message: Message) -> Result<(), QueueClosed> {
        self.tx.send(message).await.map_err(|_| QueueClosed)?;
        metrics::counter!("notifications_queued_total").increment(1);
        Ok(())
    }

    /// Number of messages waiting for the dispatcher.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}
