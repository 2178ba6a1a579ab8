//! Configuration management for VaxWatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a `vaxwatch.toml` file, environment
//! variables and command-line arguments.

use crate::cli::Cli;
use crate::notification::DEFAULT_QUEUE_CAPACITY;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "vaxwatch.toml";

/// Prefix of environment overrides; nested keys are separated by `__`,
/// e.g. `VAXWATCH_SCHEDULER__DISTRICTS=[294,265]`.
pub const ENV_PREFIX: &str = "VAXWATCH_";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    pub core: CoreConfig,
    pub metrics: MetricsConfig,
    pub scheduler: SchedulerConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub cowin: CowinConfig,
    pub notifier: NotifierConfig,
}

/// Process-wide settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoreConfig {
    /// The logging level for the application.
    pub log_level: String,
    /// How long shutdown waits for running tasks before giving up.
    pub shutdown_grace_seconds: u64,
}

/// Settings for the in-process metrics logger.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Install the counter recorder and log its values periodically.
    pub log_metrics: bool,
    pub log_interval_seconds: u64,
}

/// Scheduling settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Schedule used by sources registered without their own.
    pub default_schedule: String,
    /// District ids polled by the CoWIN source.
    pub districts: Vec<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PerformanceConfig {
    /// Messages that may wait for the dispatcher before jobs block.
    pub notification_queue_capacity: usize,
}

/// Settings shared by every outbound HTTP client.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
    /// Whether to accept invalid TLS certificates (for testing).
    pub allow_invalid_certs: bool,
}

/// Settings for the CoWIN appointment source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CowinConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Schedule for this source; empty means the default schedule.
    pub schedule: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct NotifierConfig {
    pub formspree: FormspreeConfig,
    pub log: LogNotifierConfig,
}

/// Configuration for Formspree alerts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FormspreeConfig {
    pub base_url: String,
    /// Form to submit to; the notifier is disabled without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub sender_name: String,
    pub sender_email: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LogNotifierConfig {
    pub enabled: bool,
}

impl Config {
    /// Loads the configuration by layering defaults, the config file, the
    /// environment and the command line, in that order of precedence.
    ///
    /// An explicitly given config file must exist; the default file is optional.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        figment = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found at specified path: {}", path.display());
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(cli.clone())
            .extract()?;
        Ok(config)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            shutdown_grace_seconds: 2,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_metrics: false,
            log_interval_seconds: 60,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_schedule: "@every 1m".to_string(),
            districts: vec![],
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            notification_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: concat!("vaxwatch/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_invalid_certs: false,
        }
    }
}

impl Default for CowinConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://cdn-api.co-vin.in/api".to_string(),
            schedule: String::new(),
        }
    }
}

impl Default for FormspreeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://formspree.io".to_string(),
            form_id: None,
            sender_name: "VaxWatch".to_string(),
            sender_email: "vaxwatch@localhost".to_string(),
        }
    }
}

impl Default for LogNotifierConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
