//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments using the `clap` crate.
//! The global options double as a `figment` provider so they take part in
//! configuration layering with the highest priority.

use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Evaluates entity change events against alert subscriptions.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "alertwatch", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level, used when RUST_LOG is not set.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Subscription file to load; repeat for several. Replaces the configured list.
    #[arg(short, long = "subscriptions", value_name = "FILE", global = true)]
    pub subscription_files: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compile every subscription rule and report the first error.
    Validate,
    /// Evaluate JSON-lines change events and print the subscriptions each triggers.
    Evaluate {
        /// Events file; stdin when omitted.
        #[arg(value_name = "FILE")]
        events: Option<PathBuf>,
    },
    /// Print the predicate function catalog as JSON.
    Functions,
    /// Compile one rule expression and print its canonical form.
    Check {
        /// The rule expression.
        expression: String,
    },
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            let mut core = Dict::new();
            core.insert("log_level".into(), Value::from(level.clone()));
            dict.insert("core".into(), Value::from(core));
        }

        if !self.subscription_files.is_empty() {
            let files: Vec<Value> = self
                .subscription_files
                .iter()
                .map(|path| Value::from(path.display().to_string()))
                .collect();
            let mut subscriptions = Dict::new();
            subscriptions.insert("files".into(), Value::from(files));
            dict.insert("subscriptions".into(), Value::from(subscriptions));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_evaluate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "alertwatch",
            "evaluate",
            "events.jsonl",
            "-s",
            "a.yml",
            "--subscriptions",
            "b.yml",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(
            cli.command,
            Some(Command::Evaluate {
                events: Some(PathBuf::from("events.jsonl"))
            })
        );
        assert_eq!(
            cli.subscription_files,
            vec![PathBuf::from("a.yml"), PathBuf::from("b.yml")]
        );
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_empty_cli_provides_no_values() {
        let data = Cli::default().data().unwrap();
        assert!(data[&Profile::Default].is_empty());
    }
}
