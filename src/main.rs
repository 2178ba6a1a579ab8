//! VaxWatch - Vaccination Appointment Watcher
//!
//! Polls the CoWIN API for open vaccination slots on a schedule and sends an
//! alert for every session with free capacity.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vaxwatch::{
    app::App,
    cli::Cli,
    config::Config,
    http::build_client,
    internal_metrics::{log_counters, LoggingRecorder},
    sources::CowinClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).context("Failed to load configuration")?;

    // Initialize logging; RUST_LOG takes precedence over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.core.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.list_states || cli.list_districts.is_some() {
        return print_locations(&cli, &config).await;
    }

    info!("VaxWatch starting up...");

    // Log the loaded configuration settings for visibility
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.core.log_level);
    info!("Default Schedule: {}", config.scheduler.default_schedule);
    info!("Districts: {:?}", config.scheduler.districts);
    info!(
        "Notification Queue Capacity: {}",
        config.performance.notification_queue_capacity
    );
    info!("HTTP Timeout: {}s", config.http.timeout_seconds);
    info!(
        "CoWIN Source: {}",
        if config.cowin.enabled { "Enabled" } else { "Disabled" }
    );
    info!("CoWIN URL: {}", config.cowin.base_url);
    info!(
        "Formspree Notifier: {}",
        if config.notifier.formspree.form_id.is_some() {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    info!(
        "Log Notifier: {}",
        if config.notifier.log.enabled { "Enabled" } else { "Disabled" }
    );
    info!("Shutdown Grace Period: {}s", config.core.shutdown_grace_seconds);
    info!(
        "Metrics Logging: {}",
        if config.metrics.log_metrics { "Enabled" } else { "Disabled" }
    );
    info!("-------------------------------------------------------");

    let grace_period = Duration::from_secs(config.core.shutdown_grace_seconds);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if config.metrics.log_metrics {
        let recorder = LoggingRecorder::new();
        let counters = recorder.counters();
        metrics::set_global_recorder(recorder)
            .map_err(|_| anyhow!("A metrics recorder is already installed"))?;
        tokio::spawn(log_counters(
            counters,
            Duration::from_secs(config.metrics.log_interval_seconds.max(1)),
            shutdown_rx.clone(),
        ));
    }

    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::signal::ctrl_c().await?;
    info!("Interrupt signal received. Shutting down gracefully...");
    shutdown_tx.send_replace(true);

    app.shutdown(grace_period).await?;
    info!("All tasks shut down. Exiting.");
    Ok(())
}

/// Prints CoWIN state or district ids to help fill in the configuration.
async fn print_locations(cli: &Cli, config: &Config) -> Result<()> {
    let client = CowinClient::new(build_client(&config.http)?, &config.cowin.base_url);

    if cli.list_states {
        for state in client.list_states().await? {
            println!("{:>4}  {}", state.state_id, state.state_name);
        }
    }

    if let Some(state_id) = cli.list_districts {
        for district in client.list_districts(state_id).await? {
            println!("{:>4}  {}", district.district_id, district.district_name);
        }
    }
    Ok(())
}
