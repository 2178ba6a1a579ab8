//! Manages the lifecycle of all long-lived tasks in the application.
use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Resolves once the shutdown flag has been raised.
///
/// If the sender side is gone no signal can ever arrive, so this never resolves.
pub async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// A centralized manager for long-lived tasks.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping track of their `JoinHandle`s.
/// - Handing out the shared shutdown receiver.
/// - Awaiting all tracked tasks during graceful shutdown, including tasks
///   spawned by other tracked tasks while shutdown is in progress.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(String, JoinHandle<()>)>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    /// Creates a new `TaskManager`.
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    ///
    /// Handles of tasks that already finished are released on every spawn.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        debug!(task_name = %name, "Spawning task");
        let handle = tokio::spawn(future);
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|(_, handle)| !handle.is_finished());
        handles.push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Number of tasks currently tracked.
    pub fn task_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Waits for all managed tasks to complete.
    ///
    /// Tasks spawned while waiting are awaited too; this returns once no
    /// tracked task is left.
    pub async fn shutdown(self) {
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            self.task_count()
        );

        let mut panicked = 0;
        loop {
            let handles = self
                .handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect::<Vec<_>>();
            if handles.is_empty() {
                break;
            }

            let (task_names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
            debug!(tasks = ?task_names, "Awaiting tasks.");

            let results = join_all(handles).await;
            for (task_name, result) in task_names.iter().zip(results) {
                match result {
                    Ok(()) => debug!(%task_name, "Task shut down gracefully."),
                    Err(e) => {
                        error!(%task_name, error = %e, "Task panicked during shutdown.");
                        panicked += 1;
                    }
                }
            }
        }

        if panicked > 0 {
            error!("{} tasks panicked during shutdown.", panicked);
        } else {
            info!("All tasks shut down gracefully.");
        }
    }
}
