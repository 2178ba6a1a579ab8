//! Fan-out / fan-in over a fixed set of partition keys.
//!
//! One task is spawned per partition. Each task owns a sender handle of a shared
//! unbounded merge channel, so the channel closes exactly once: when the last
//! producer has terminated. A single collector drains the channel into the
//! result list.

use crate::core::SourceError;
use crate::task_manager::wait_for_shutdown;
use std::fmt::Display;
use std::future::Future;
use tokio::sync::watch;
use tracing::{debug, error, instrument, warn};

/// Runs `fetch` concurrently for every key in `partitions` and merges the
/// results.
///
/// A partition whose fetch fails or panics is logged and contributes no items;
/// it never fails the aggregate. The order of the returned items is unspecified.
///
/// # Returns
/// * `Ok(items)` once every partition task has finished
/// * `Err(SourceError::Cancelled)` if shutdown is signalled first. Partition
///   tasks still in flight are left to finish and their items are discarded.
#[instrument(level = "debug", skip_all, fields(partitions = partitions.len()))]
pub async fn fan_in<K, T, E, F, Fut>(
    partitions: &[K],
    fetch: F,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<Vec<T>, SourceError>
where
    K: Clone + Display + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
{
    let (merge_tx, merge_rx) = async_channel::unbounded::<T>();

    for partition in partitions.iter().cloned() {
        let merge_tx = merge_tx.clone();
        let fetch_task = tokio::spawn(fetch(partition.clone()));
        tokio::spawn(async move {
            match fetch_task.await {
                Ok(Ok(items)) => {
                    let count = items.len();
                    for item in items {
                        if merge_tx.send(item).await.is_err() {
                            debug!(%partition, "Collector is gone, discarding remaining items.");
                            return;
                        }
                    }
                    debug!(%partition, count, "Partition fetched.");
                }
                Ok(Err(e)) => {
                    metrics::counter!("partition_failures_total").increment(1);
                    warn!(%partition, error = %e, "Partition fetch failed, contributing no items.");
                }
                Err(e) => {
                    metrics::counter!("partition_failures_total").increment(1);
                    error!(%partition, error = %e, "Partition task panicked, contributing no items.");
                }
            }
        });
    }
    // Only the partition tasks may keep the channel open.
    drop(merge_tx);

    let collect = async {
        let mut items = Vec::new();
        while let Ok(item) = merge_rx.recv().await {
            items.push(item);
        }
        items
    };

    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown_rx) => {
            debug!("Shutdown signalled, abandoning fan-in.");
            Err(SourceError::Cancelled)
        }
        items = collect => {
            debug!(count = items.len(), "Fan-in complete.");
            Ok(items)
        }
    }
}
