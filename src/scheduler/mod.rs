//! Runs every registered slot source on its schedule.

pub mod job;
pub mod trigger;

pub use job::{Job, JobError};
pub use trigger::{Trigger, TriggerError};

use crate::formatting::MessageFormatter;
use crate::notification::NotificationQueue;
use crate::registry::SourceRegistry;
use crate::task_manager::TaskManager;
use job::JobContext;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, PartialEq)]
pub enum SchedulerError {
    #[error("no jobs to schedule")]
    NoJobs,
}

/// Turns registered sources into jobs and starts their clocks.
pub struct Scheduler {
    default_schedule: String,
    queue: NotificationQueue,
    formatter: Arc<dyn MessageFormatter>,
    task_manager: TaskManager,
}

impl Scheduler {
    pub fn new(
        default_schedule: impl Into<String>,
        queue: NotificationQueue,
        formatter: Arc<dyn MessageFormatter>,
        task_manager: TaskManager,
    ) -> Self {
        Self {
            default_schedule: default_schedule.into(),
            queue,
            formatter,
            task_manager,
        }
    }

    /// Schedules one job per registered source.
    ///
    /// Sources registered under an empty key run on the default schedule.
    /// A source whose schedule does not parse is skipped with a warning.
    ///
    /// # Returns
    /// * `Ok(n)` with the number of jobs started
    /// * `Err(SchedulerError::NoJobs)` if the registry is empty; nothing is started
    pub fn schedule_jobs(&self, sources: &SourceRegistry) -> Result<usize, SchedulerError> {
        if sources.is_empty() {
            return Err(SchedulerError::NoJobs);
        }

        let mut scheduled = 0;
        for (key, source) in sources.iter() {
            let expression = if key.is_empty() {
                self.default_schedule.as_str()
            } else {
                key
            };

            let trigger = match expression.parse::<Trigger>() {
                Ok(trigger) => trigger,
                Err(e) => {
                    warn!(source = source.name(), schedule = expression, error = %e, "Skipping source with invalid schedule.");
                    continue;
                }
            };

            let job = Job::new(expression, trigger, Arc::clone(source));
            let ctx = JobContext {
                queue: self.queue.clone(),
                formatter: Arc::clone(&self.formatter),
                shutdown_rx: self.task_manager.get_shutdown_rx(),
                tasks: self.task_manager.clone(),
            };
            info!(job = job.name(), schedule = expression, "Scheduling job.");
            self.task_manager
                .spawn(format!("Job-{}", job.name()), job.run(ctx));
            scheduled += 1;
        }

        if scheduled == 0 {
            warn!("No source had a valid schedule, nothing will be polled.");
        }
        Ok(scheduled)
    }
}
