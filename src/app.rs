//! Command handlers for the `alertwatch` binary.
//!
//! Handlers write their results to the given writer and log through
//! `tracing`, so they can be driven from tests without a process.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::cache::ExpressionCache;
use crate::cli::Command;
use crate::config::Config;
use crate::event::ChangeEvent;
use crate::expression::compile;
use crate::functions::Predicate;
use crate::subscription::SubscriptionMatcher;

/// Totals reported by an `evaluate` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationSummary {
    pub events: usize,
    pub skipped: usize,
    pub triggered: usize,
}

/// Runs one command to completion.
pub fn run(command: Command, config: &Config, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Validate => validate(config, out),
        Command::Evaluate { events } => {
            let cache = ExpressionCache::from_config(&config.cache);
            let matcher = SubscriptionMatcher::load(&config.subscriptions, &cache)?;
            let summary = match events {
                Some(path) => evaluate_stream(&matcher, open_events(&path)?, out)?,
                None => evaluate_stream(&matcher, io::stdin().lock(), out)?,
            };
            info!(
                events = summary.events,
                skipped = summary.skipped,
                triggered = summary.triggered,
                "Evaluation finished"
            );
            Ok(())
        }
        Command::Functions => {
            let catalog = serde_json::to_string_pretty(&Predicate::catalog())?;
            writeln!(out, "{catalog}")?;
            Ok(())
        }
        Command::Check { expression } => {
            let compiled = compile(&expression)
                .with_context(|| format!("Invalid rule expression: {expression}"))?;
            writeln!(out, "{compiled}")?;
            Ok(())
        }
    }
}

fn validate(config: &Config, out: &mut impl Write) -> Result<()> {
    let cache = ExpressionCache::from_config(&config.cache);
    let matcher = SubscriptionMatcher::load(&config.subscriptions, &cache)?;
    writeln!(
        out,
        "{} subscriptions, {} rules: all valid",
        matcher.len(),
        matcher.rule_count()
    )?;
    Ok(())
}

fn open_events(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open events file: {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Evaluates one JSON-encoded [`ChangeEvent`] per line.
///
/// Each event produces one output line naming the subscriptions it
/// triggered. Blank lines are ignored; lines that are not a valid event are
/// logged and skipped.
pub fn evaluate_stream(
    matcher: &SubscriptionMatcher,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<EvaluationSummary> {
    let mut summary = EvaluationSummary::default();

    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.with_context(|| format!("Failed to read event line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let event: ChangeEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_number, error = %e, "Skipping malformed change event");
                summary.skipped += 1;
                continue;
            }
        };

        let subscriptions = matcher.matches(&event);
        summary.events += 1;
        if !subscriptions.is_empty() {
            summary.triggered += 1;
        }

        let record = json!({
            "line": line_number,
            "eventType": event.event_type(),
            "entityType": event.entity_type(),
            "entityFullyQualifiedName": event.entity_fqn(),
            "subscriptions": subscriptions,
        });
        writeln!(out, "{record}")?;
    }

    Ok(summary)
}
