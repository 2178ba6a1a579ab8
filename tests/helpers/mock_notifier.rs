#![allow(dead_code)]
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::Notify;
use vaxwatch::core::{Message, Notifier};

/// A mock Notifier that records every message and can be told to fail.
#[derive(Clone, Debug)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<Message>>>,
    pub calls: Arc<AtomicUsize>,
    fail_on_notify: Arc<AtomicBool>,
    notifier: Arc<Notify>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_on_notify: Arc::new(AtomicBool::new(false)),
            notifier: Arc::new(Notify::new()),
        }
    }

    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_fail_on_notify(true);
        notifier
    }

    pub fn set_fail_on_notify(&self, fail: bool) {
        self.fail_on_notify.store(fail, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    /// Waits until at least `target_count` calls have been made.
    pub async fn wait_for_calls(&self, target_count: usize, timeout_duration: std::time::Duration) {
        let wait_future = async {
            loop {
                let notified = self.notifier.notified();
                if self.calls.load(Ordering::SeqCst) >= target_count {
                    break;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout_duration, wait_future)
            .await
            .expect("Timed out waiting for notifications");
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording_mock"
    }

    async fn notify(&self, message: &Message) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.notifier.notify_waiters();
        if self.fail_on_notify.load(Ordering::SeqCst) {
            anyhow::bail!("Mock notifier failed as configured");
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }
}
