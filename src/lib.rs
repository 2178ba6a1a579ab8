/// VaxWatch - A vaccination appointment slot watcher
///
/// This library provides the scheduling, aggregation and notification
/// pipeline that polls appointment sources and alerts on open slots.
pub mod aggregator;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod http;
pub mod internal_metrics;
pub mod notification;
pub mod registry;
pub mod scheduler;
pub mod services;
pub mod sources;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
