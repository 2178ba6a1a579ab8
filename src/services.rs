//! Encapsulation for setting up the configured sources and notifiers.

use crate::{
    config::Config,
    notification::{FormspreeNotifier, LogNotifier},
    registry::{NotifierRegistry, SourceRegistry},
    sources::CowinSource,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Registers every enabled slot source under its schedule key.
pub fn build_sources(config: &Config) -> SourceRegistry {
    let mut sources = SourceRegistry::new();
    if config.cowin.enabled {
        if config.scheduler.districts.is_empty() {
            warn!("CoWIN source is enabled but no districts are configured; its runs will fail.");
        }
        let source = CowinSource::new(
            config.scheduler.districts.clone(),
            &config.cowin,
            &config.http,
        );
        sources.register(&config.cowin.schedule, Arc::new(source));
        info!("CoWIN source enabled.");
    }
    sources
}

/// Registers every configured notifier under its channel name.
pub fn build_notifiers(config: &Config) -> Result<NotifierRegistry> {
    let mut notifiers = NotifierRegistry::new();

    if let Some(formspree) = FormspreeNotifier::from_config(&config.notifier.formspree, &config.http)? {
        info!(endpoint = formspree.endpoint(), "Formspree notifications enabled.");
        notifiers.register("formspree", Arc::new(formspree));
    }

    if config.notifier.log.enabled {
        notifiers.register("log", Arc::new(LogNotifier));
    }

    if notifiers.is_empty() {
        warn!("No notifiers are configured; alerts will be dropped.");
    }
    Ok(notifiers)
}
