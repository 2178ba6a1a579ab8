//! A notifier that writes messages to the application log.
//!
//! Useful on its own when no external channel is configured, and for checking
//! that the pipeline delivers at all.

use crate::core::{Message, Notifier};
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, message: &Message) -> anyhow::Result<()> {
        info!(timestamp = %message.timestamp, "Appointment alert:\n{}", message.content);
        Ok(())
    }
}
