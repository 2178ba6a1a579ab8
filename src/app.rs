//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    formatting::{MessageFormatter, PlainTextFormatter},
    notification::{Dispatcher, NotificationQueue},
    registry::{NotifierRegistry, SourceRegistry},
    scheduler::Scheduler,
    services::{build_notifiers, build_sources},
    task_manager::TaskManager,
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    jobs_scheduled: usize,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Number of jobs whose clocks are running.
    pub fn jobs_scheduled(&self) -> usize {
        self.jobs_scheduled
    }

    /// Waits for the shutdown signal, then shuts down gracefully.
    pub async fn run(self, grace_period: Duration) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        crate::task_manager::wait_for_shutdown(&mut shutdown_rx).await;
        info!("Shutdown signal received in run function. Waiting for tasks to complete...");
        self.shutdown(grace_period).await
    }

    /// Waits up to `grace_period` for job clocks, in-flight runs and the
    /// dispatcher to stop.
    ///
    /// The shutdown signal must already have been sent. Runs still going when
    /// the grace period elapses are not aborted; they are abandoned when the
    /// process exits.
    pub async fn shutdown(self, grace_period: Duration) -> Result<()> {
        if timeout(grace_period, self.task_manager.shutdown()).await.is_err() {
            warn!(
                grace_seconds = grace_period.as_secs_f64(),
                "Grace period elapsed before all tasks finished."
            );
        }
        Ok(())
    }
}

/// Builder for the main application.
///
/// This pattern allows for a clean separation of concerns between constructing
/// the application's components and running the application. It also provides
/// a convenient way to override components for testing purposes.
pub struct AppBuilder {
    config: Config,
    sources_override: Option<SourceRegistry>,
    notifiers_override: Option<NotifierRegistry>,
    formatter_override: Option<Arc<dyn MessageFormatter>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sources_override: None,
            notifiers_override: None,
            formatter_override: None,
        }
    }

    /// Overrides the configured slot sources.
    pub fn sources_override(mut self, sources: SourceRegistry) -> Self {
        self.sources_override = Some(sources);
        self
    }

    /// Overrides the configured notifiers.
    pub fn notifiers_override(mut self, notifiers: NotifierRegistry) -> Self {
        self.notifiers_override = Some(notifiers);
        self
    }

    /// Overrides the message formatter.
    pub fn formatter_override(mut self, formatter: Arc<dyn MessageFormatter>) -> Self {
        self.formatter_override = Some(formatter);
        self
    }

    /// Builds the registries, schedules every job and starts the dispatcher.
    ///
    /// # Returns
    /// * `Err` if no source is registered or a notifier cannot be built
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Plugins
        // =========================================================================
        let sources = match self.sources_override {
            Some(sources) => sources,
            None => build_sources(&config),
        };
        let notifiers = match self.notifiers_override {
            Some(notifiers) => notifiers,
            None => build_notifiers(&config)?,
        };
        let formatter = self
            .formatter_override
            .unwrap_or_else(|| Arc::new(PlainTextFormatter));
        debug!(
            sources = sources.len(),
            notifiers = notifiers.len(),
            "Plugins registered."
        );

        // =========================================================================
        // 2. Scheduler
        // =========================================================================
        let (queue, queue_rx) =
            NotificationQueue::bounded(config.performance.notification_queue_capacity);
        let scheduler = Scheduler::new(
            config.scheduler.default_schedule.clone(),
            queue,
            formatter,
            task_manager.clone(),
        );
        let jobs_scheduled = scheduler.schedule_jobs(&sources)?;

        // =========================================================================
        // 3. Dispatcher
        // =========================================================================
        let dispatcher = Dispatcher::new(Arc::new(notifiers), queue_rx);
        task_manager.spawn("Dispatcher", dispatcher.run(task_manager.get_shutdown_rx()));

        info!(jobs_scheduled, "VaxWatch initialized successfully. Polling for appointments...");

        Ok(App {
            task_manager,
            jobs_scheduled,
        })
    }
}
