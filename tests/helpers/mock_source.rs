#![allow(dead_code)]
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::watch;
use vaxwatch::core::{Appointment, SlotSource, SourceError};

/// How a [`MockSource`] behaves when fetched.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Returns one appointment per capacity.
    Capacities(Vec<i64>),
    /// Fails initialization.
    FailInitialize,
    /// Fails the whole fetch.
    FailFetch,
    /// Panics inside the fetch.
    Panic,
}

/// A scripted slot source that tracks how many fetches overlap.
#[derive(Clone, Debug)]
pub struct MockSource {
    name: String,
    behavior: Behavior,
    delay: Duration,
    pub calls: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every fetch take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fetches that ran to the end of their delay.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Waits until at least `target` fetches have started.
    pub async fn wait_for_calls(&self, target: usize, timeout_duration: Duration) {
        tokio::time::timeout(timeout_duration, async {
            while self.calls() < target {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for fetches");
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Builds an appointment at a named center with the given capacity.
pub fn appointment(center_name: &str, available_capacity: i64) -> Appointment {
    Appointment {
        center_id: 1,
        center_name: center_name.to_string(),
        district: "Mock District".to_string(),
        date: "17-10-2026".to_string(),
        available_capacity,
        min_age_18: true,
        vaccine: "COVISHIELD".to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl SlotSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), SourceError> {
        if matches!(self.behavior, Behavior::FailInitialize) {
            return Err(SourceError::Configuration("mock init failure".to_string()));
        }
        Ok(())
    }

    async fn fetch_all(
        &self,
        _shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Vec<Appointment>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            Behavior::Capacities(capacities) => Ok(capacities
                .iter()
                .map(|&capacity| appointment(&format!("{} {}", self.name, capacity), capacity))
                .collect()),
            Behavior::FailFetch => Err(SourceError::Configuration("mock fetch failure".to_string())),
            Behavior::Panic => panic!("mock source panicked"),
            Behavior::FailInitialize => Ok(vec![]),
        }
    }
}
