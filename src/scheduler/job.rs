//! A single scheduled binding of a trigger to a slot source.

use crate::core::{Message, SlotSource, SourceError};
use crate::formatting::MessageFormatter;
use crate::notification::{NotificationQueue, QueueClosed};
use crate::scheduler::trigger::Trigger;
use crate::task_manager::{wait_for_shutdown, TaskManager};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, instrument, warn};

/// Why a run produced no notifications.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to initialize source: {0}")]
    Initialize(SourceError),

    #[error("failed to fetch appointments: {0}")]
    Fetch(SourceError),

    #[error(transparent)]
    Queue(#[from] QueueClosed),
}

/// Everything a run needs besides its source.
#[derive(Clone)]
pub(crate) struct JobContext {
    pub(crate) queue: NotificationQueue,
    pub(crate) formatter: Arc<dyn MessageFormatter>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
    /// Runs are tracked here so shutdown can wait for them.
    pub(crate) tasks: TaskManager,
}

/// A trigger bound to a source.
///
/// A job is either idle or running. A firing that arrives while the previous
/// run is still in progress is skipped, not queued.
pub struct Job {
    name: String,
    expression: String,
    trigger: Trigger,
    source: Arc<dyn SlotSource>,
    running: Arc<Semaphore>,
}

impl Job {
    pub fn new(expression: impl Into<String>, trigger: Trigger, source: Arc<dyn SlotSource>) -> Self {
        Self {
            name: source.name().to_string(),
            expression: expression.into(),
            trigger,
            source,
            running: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the job clock until shutdown is signalled.
    ///
    /// Runs already in flight when the clock stops are left to finish; they
    /// are tracked by the context's `TaskManager`.
    #[instrument(skip_all, fields(job = %self.name, schedule = %self.expression))]
    pub(crate) async fn run(self, ctx: JobContext) {
        let mut shutdown_rx = ctx.shutdown_rx.clone();
        info!("Job clock started.");

        let mut cursor = Utc::now();
        loop {
            let Some(next) = self.trigger.next_fire(cursor, Utc::now()) else {
                warn!("Schedule has no upcoming firings, stopping job clock.");
                break;
            };
            let delay = (next - Utc::now()).to_std().unwrap_or_default();
            debug!(next = %next.to_rfc3339(), "Waiting for next firing.");

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => {
                    info!("Job clock received shutdown signal.");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    self.fire(&ctx);
                    cursor = next;
                }
            }
        }
        info!("Job clock stopped.");
    }

    /// Starts a run unless one is already in progress.
    ///
    /// # Returns
    /// * `true` if a run was started.
    /// * `false` if the firing was skipped.
    pub(crate) fn fire(&self, ctx: &JobContext) -> bool {
        let Ok(permit) = Arc::clone(&self.running).try_acquire_owned() else {
            metrics::counter!("jobs_skipped_total").increment(1);
            warn!(job = %self.name, "Previous run still in progress, skipping this firing.");
            return false;
        };
        metrics::counter!("jobs_started_total").increment(1);

        let job = self.name.clone();
        let source = Arc::clone(&self.source);
        let run_ctx = ctx.clone();
        ctx.tasks.spawn(format!("Run-{job}"), async move {
            let ctx = run_ctx;
            // Held until the run ends, even if it panics.
            let _permit = permit;
            let run = tokio::spawn(async move { execute(source.as_ref(), &ctx).await });
            match run.await {
                Ok(Ok(queued)) => info!(%job, queued, "Run completed."),
                Ok(Err(e)) => {
                    metrics::counter!("jobs_failed_total").increment(1);
                    error!(%job, error = %e, "Run failed.");
                }
                Err(e) => {
                    metrics::counter!("jobs_failed_total").increment(1);
                    error!(%job, error = %e, "Run panicked.");
                }
            }
        });
        true
    }
}

/// Performs one run: initialize, fetch, then queue a message per deliverable
/// appointment.
///
/// # Returns
/// * `Ok(n)` with the number of messages queued
/// * `Err` if the source could not initialize or fetch, or the queue is closed
pub(crate) async fn execute(source: &dyn SlotSource, ctx: &JobContext) -> Result<usize, JobError> {
    source.initialize().await.map_err(JobError::Initialize)?;
    let appointments = source
        .fetch_all(ctx.shutdown_rx.clone())
        .await
        .map_err(JobError::Fetch)?;
    debug!(found = appointments.len(), "Appointments fetched.");

    let mut queued = 0;
    for appointment in appointments.iter().filter(|a| a.is_deliverable()) {
        let message = Message::new(ctx.formatter.format(appointment));
        ctx.queue.push(message).await?;
        queued += 1;
    }
    Ok(queued)
}
