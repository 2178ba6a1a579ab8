#![allow(dead_code)]
pub mod mock_notifier;
pub mod mock_source;

use std::sync::Arc;
use vaxwatch::config::Config;
use mock_notifier::RecordingNotifier;
use mock_source::MockSource;
use vaxwatch::registry::{NotifierRegistry, SourceRegistry};

/// A config that never touches the network: CoWIN and the log notifier are off.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.cowin.enabled = false;
    config.notifier.log.enabled = false;
    config.core.shutdown_grace_seconds = 1;
    config
}

/// Registers each source under its schedule key.
pub fn sources(entries: &[(&str, &MockSource)]) -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    for (schedule, source) in entries {
        registry.register(schedule, Arc::new((*source).clone()));
    }
    registry
}

/// Registers each notifier under its name.
pub fn notifiers(entries: &[(&str, &RecordingNotifier)]) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    for (name, notifier) in entries {
        registry.register(name, Arc::new((*notifier).clone()));
    }
    registry
}
