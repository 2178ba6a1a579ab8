//! A metrics recorder that keeps counters in memory and periodically logs them.

use crate::task_manager::wait_for_shutdown;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Shared view of every counter a [`LoggingRecorder`] has registered.
///
/// Counters are keyed by name, followed by their labels when present
/// (e.g. `notifications_sent_total{notifier=log}`).
#[derive(Clone, Debug, Default)]
pub struct CounterStore {
    counters: Arc<Mutex<BTreeMap<String, Arc<AtomicU64>>>>,
}

impl CounterStore {
    fn get_or_create(&self, key: String) -> Arc<AtomicU64> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(counters.entry(key).or_default())
    }

    /// Current value of a counter, summed across all of its label sets.
    pub fn get(&self, name: &str) -> u64 {
        let labelled = format!("{name}{{");
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, _)| key.as_str() == name || key.starts_with(&labelled))
            .map(|(_, value)| value.load(Ordering::Relaxed))
            .sum()
    }

    /// Every counter with its current value, ordered by key.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, value)| (key.clone(), value.load(Ordering::Relaxed)))
            .collect()
    }
}

fn counter_key(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}{{{}}}", key.name(), labels.join(","))
    }
}

/// An in-memory recorder for counters. Gauges and histograms are not used by
/// this application and are dropped.
#[derive(Debug, Default)]
pub struct LoggingRecorder {
    store: CounterStore,
}

impl LoggingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the counters, usable after the recorder is installed.
    pub fn counters(&self) -> CounterStore {
        self.store.clone()
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.store.get_or_create(counter_key(key)))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Logs a snapshot of `counters` every `interval` until shutdown.
pub async fn log_counters(
    counters: CounterStore,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                debug!("Metrics logging task received shutdown signal.");
                break;
            }
            _ = ticker.tick() => {
                for (key, value) in counters.snapshot() {
                    info!("[Counter] {}: {}", key, value);
                }
            }
        }
    }
}
