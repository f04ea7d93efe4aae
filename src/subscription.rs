//! Alert subscriptions and the matcher that decides which of them an event
//! triggers.
//!
//! Subscriptions are defined in YAML files. Every rule condition is compiled
//! when the file is loaded, so an invalid rule is reported at load time rather
//! than silently never matching.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::ExpressionCache;
use crate::config::SubscriptionsConfig;
use crate::event::ChangeEvent;
use crate::expression::CompiledExpression;

/// The resource name that puts every entity type in scope.
pub const ALL_RESOURCES: &str = "all";

/// How a rule's verdict counts towards its subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// The rule contributes its verdict.
    #[default]
    Include,
    /// The rule contributes the negation of its verdict.
    Exclude,
}

/// How the rule contributions of a subscription are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every rule must contribute `true`.
    #[default]
    All,
    /// At least one rule must contribute `true`.
    Any,
}

/// A named, compiled filtering rule.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub name: String,
    pub effect: Effect,
    pub expression: Arc<CompiledExpression>,
}

impl FilterRule {
    fn contributes(&self, event: &ChangeEvent) -> bool {
        let verdict = self.expression.evaluate(event);
        match self.effect {
            Effect::Include => verdict,
            Effect::Exclude => !verdict,
        }
    }
}

/// A single alert subscription with its rules compiled.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub name: String,
    pub enabled: bool,
    /// Entity types in scope. Empty, or containing `"all"`, means every type.
    pub resources: Vec<String>,
    pub policy: MatchPolicy,
    pub rules: Vec<FilterRule>,
}

impl Subscription {
    /// Checks if the event's entity type is in scope for this subscription.
    pub fn covers(&self, event: &ChangeEvent) -> bool {
        self.resources.is_empty()
            || self
                .resources
                .iter()
                .any(|resource| resource == ALL_RESOURCES || resource == event.entity_type())
    }

    /// Evaluates the subscription against an event.
    ///
    /// A subscription without rules triggers on every event in scope.
    pub fn is_match(&self, event: &ChangeEvent) -> bool {
        if !self.enabled || !self.covers(event) {
            return false;
        }
        if self.rules.is_empty() {
            return true;
        }
        match self.policy {
            MatchPolicy::All => self.rules.iter().all(|rule| rule.contributes(event)),
            MatchPolicy::Any => self.rules.iter().any(|rule| rule.contributes(event)),
        }
    }

    /// Compiles a subscription as read from a file.
    fn compile(raw: FileSubscription, cache: &ExpressionCache) -> Result<Self> {
        let mut rules = Vec::with_capacity(raw.rules.len());
        for rule in raw.rules {
            let expression = cache.get_or_compile(&rule.condition).with_context(|| {
                format!(
                    "Invalid condition in rule '{}' of subscription '{}': {}",
                    rule.name, raw.name, rule.condition
                )
            })?;
            rules.push(FilterRule {
                name: rule.name,
                effect: rule.effect,
                expression,
            });
        }

        Ok(Self {
            name: raw.name,
            enabled: raw.enabled,
            resources: raw.resources,
            policy: raw.policy,
            rules,
        })
    }

    /// Parses and compiles the subscriptions in a YAML document.
    pub fn parse_all(yaml: &str, cache: &ExpressionCache) -> Result<Vec<Subscription>> {
        let raw: Vec<FileSubscription> =
            serde_yml::from_str(yaml).context("Failed to parse subscription YAML")?;
        raw.into_iter()
            .map(|subscription| Self::compile(subscription, cache))
            .collect()
    }

    /// Loads and compiles the subscriptions in a single file.
    pub fn load_from_file(path: &Path, cache: &ExpressionCache) -> Result<Vec<Subscription>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subscription file: {}", path.display()))?;
        Self::parse_all(&content, cache)
            .with_context(|| format!("Failed to load subscription file: {}", path.display()))
    }
}

/// The set of loaded subscriptions.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionMatcher {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionMatcher {
    /// Loads every configured subscription file.
    pub fn load(config: &SubscriptionsConfig, cache: &ExpressionCache) -> Result<Self> {
        let mut subscriptions = Vec::new();
        for path in &config.files {
            let loaded = Subscription::load_from_file(path, cache)?;
            debug!(file = %path.display(), count = loaded.len(), "Loaded subscriptions");
            subscriptions.extend(loaded);
        }

        let matcher = Self::new(subscriptions)?;
        info!(
            subscriptions = matcher.len(),
            rules = matcher.rule_count(),
            "Subscriptions ready"
        );
        Ok(matcher)
    }

    /// Creates a matcher, rejecting duplicate subscription names.
    pub fn new(subscriptions: Vec<Subscription>) -> Result<Self> {
        let mut seen = HashSet::new();
        for subscription in &subscriptions {
            if !seen.insert(subscription.name.as_str()) {
                bail!("duplicate subscription name: '{}'", subscription.name);
            }
        }
        Ok(Self { subscriptions })
    }

    /// Returns the names of the subscriptions the event triggers, in load order.
    pub fn matches(&self, event: &ChangeEvent) -> Vec<String> {
        let _span = tracing::debug_span!(
            "subscription_matcher_matches",
            entity_type = event.entity_type(),
            event_type = %event.event_type()
        )
        .entered();

        let matched: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|subscription| subscription.is_match(event))
            .map(|subscription| subscription.name.clone())
            .collect();

        metrics::counter!("subscription_matches").increment(matched.len() as u64);
        matched
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// The total number of rules across all subscriptions.
    pub fn rule_count(&self) -> usize {
        self.subscriptions.iter().map(|s| s.rules.len()).sum()
    }
}

// --- Deserialization-only structs ---

/// A subscription as written in a YAML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSubscription {
    name: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default, rename = "match")]
    policy: MatchPolicy,
    #[serde(default)]
    rules: Vec<FileRule>,
}

/// A filtering rule as written in a YAML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileRule {
    name: String,
    #[serde(default)]
    effect: Effect,
    condition: String,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    fn parse(yaml: &str) -> Vec<Subscription> {
        Subscription::parse_all(yaml, &ExpressionCache::new(64, None)).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let subscriptions = parse(
            r#"
- name: everything
- name: tables
  resources: [table]
  rules:
    - name: created
      condition: "matchAnyEventType('entityCreated')"
"#,
        );

        assert_eq!(subscriptions.len(), 2);
        let everything = &subscriptions[0];
        assert!(everything.enabled);
        assert!(everything.resources.is_empty());
        assert_eq!(everything.policy, MatchPolicy::All);
        assert!(everything.rules.is_empty());

        let tables = &subscriptions[1];
        assert_eq!(tables.rules[0].effect, Effect::Include);
        assert_eq!(tables.rules[0].expression.source(), "matchAnyEventType('entityCreated')");
    }

    #[test]
    fn test_resources_scope() {
        let subscriptions = parse(
            r#"
- name: tables
  resources: [table]
- name: all
  resources: [all]
"#,
        );
        let table = ChangeEvent::new(EventType::EntityCreated, "table", "admin");
        let topic = ChangeEvent::new(EventType::EntityCreated, "topic", "admin");

        assert!(subscriptions[0].is_match(&table));
        assert!(!subscriptions[0].is_match(&topic));
        assert!(subscriptions[1].is_match(&topic));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = Subscription::parse_all(
            "- name: typo\n  rulez: []\n",
            &ExpressionCache::new(64, None),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let subscriptions = parse("- name: dup\n- name: dup\n");
        let err = SubscriptionMatcher::new(subscriptions).unwrap_err();
        assert!(err.to_string().contains("duplicate subscription name: 'dup'"));
    }
}
