//! Configuration management for alertwatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer, from lowest to highest priority: built-in
//! defaults, an `alertwatch.toml` file, `ALERTWATCH_`-prefixed environment
//! variables and command-line arguments.

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::Cli;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "alertwatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoreConfig {
    /// The logging level, used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where subscription definitions are loaded from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SubscriptionsConfig {
    /// YAML files, each holding a list of subscriptions.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// Configuration for the compiled expression cache.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// The maximum number of compiled expressions kept.
    pub max_capacity: u64,
    /// Evict expressions that have not been used for this many seconds.
    #[serde(default)]
    pub time_to_idle_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            time_to_idle_seconds: None,
        }
    }
}

impl Config {
    /// Loads the configuration, layering every source over the defaults.
    ///
    /// Environment variables nest with a double underscore, e.g.
    /// `ALERTWATCH_CACHE__MAX_CAPACITY=500`.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("ALERTWATCH_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| {
                format!(
                    "Failed to load configuration (file: {})",
                    config_path.display()
                )
            })
    }
}
