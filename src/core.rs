//! Core domain types and plugin traits for VaxWatch
//!
//! This module defines the records that flow through the pipeline and the
//! trait contracts implemented by slot sources and notifiers.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// An open vaccination appointment discovered by a slot source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Appointment {
    pub center_id: i64,
    pub center_name: String,
    pub address: String,
    pub state: String,
    pub district: String,
    pub block: String,
    pub pincode: i64,
    /// Opening time of the center, e.g. "09:00:00"
    pub from: String,
    /// Closing time of the center, e.g. "17:00:00"
    pub to: String,
    /// Fee type as reported by the source ("Free", "Paid")
    pub fee: String,
    /// Session date in `dd-mm-YYYY` form
    pub date: String,
    /// Number of doses still bookable for this session
    pub available_capacity: i64,
    pub min_age_18: bool,
    pub min_age_45: bool,
    pub for_all: bool,
    pub vaccine: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<String>,
}

impl Appointment {
    /// Only appointments with at least one free dose are worth an alert.
    pub fn is_deliverable(&self) -> bool {
        self.available_capacity > 0
    }
}

/// A formatted, timestamped notification handed to every notifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Message {
    pub content: String,
    /// RFC 3339 timestamp of when the message was created
    pub timestamp: String,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Errors surfaced by slot sources.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source is not configured: {0}")]
    Configuration(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("invalid state id: {0}")]
    InvalidState(u32),

    #[error("fetch cancelled due to shutdown")]
    Cancelled,
}

// =============================================================================
// Plugin Traits
// =============================================================================

/// A data source that polls for open appointments.
#[async_trait]
pub trait SlotSource: Send + Sync {
    /// A short, descriptive name used in logs (e.g., "cowin").
    fn name(&self) -> &str;

    /// Prepares the source for one scheduled run.
    ///
    /// # Returns
    /// * `Err` if the run cannot proceed; the run is then abandoned without
    ///   producing any notifications.
    async fn initialize(&self) -> Result<(), SourceError>;

    /// Fetches appointments across every partition the source is configured for.
    ///
    /// Failures of individual partitions are absorbed; an `Err` means the
    /// fetch as a whole could not proceed.
    async fn fetch_all(
        &self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Vec<Appointment>, SourceError>;
}

/// Delivers messages to one external channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A unique, descriptive name for the channel (e.g., "formspree", "log").
    fn name(&self) -> &str;

    /// Delivers a single message.
    ///
    /// # Returns
    /// * `Ok(())` if the message was accepted by the channel
    /// * `Err` if delivery failed (network error, rejected payload, etc.)
    async fn notify(&self, message: &Message) -> anyhow::Result<()>;
}
