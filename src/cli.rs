//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. The overriding arguments are merged on top of the config file
//! and environment through the `figment::Provider` implementation below.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Polls CoWIN for open vaccination slots and sends alerts.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Comma-separated district ids to poll.
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub districts: Option<Vec<u32>>,

    /// Default schedule, e.g. "@every 5m" or "*/10 * * * *".
    #[arg(long, value_name = "EXPR")]
    pub schedule: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Print the CoWIN state ids and exit.
    #[arg(long)]
    pub list_states: bool,

    /// Print the CoWIN district ids of a state and exit.
    #[arg(long, value_name = "STATE_ID")]
    pub list_districts: Option<u32>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        let mut scheduler = Dict::new();
        if let Some(districts) = &self.districts {
            let ids: Vec<Value> = districts.iter().map(|&id| Value::from(id)).collect();
            scheduler.insert("districts".into(), Value::from(ids));
        }
        if let Some(schedule) = &self.schedule {
            scheduler.insert("default_schedule".into(), Value::from(schedule.clone()));
        }
        if !scheduler.is_empty() {
            dict.insert("scheduler".into(), Value::from(scheduler));
        }

        if let Some(level) = &self.log_level {
            let mut core = Dict::new();
            core.insert("log_level".into(), Value::from(level.clone()));
            dict.insert("core".into(), Value::from(core));
        }

        Ok(Profile::Default.collect(dict))
    }
}
