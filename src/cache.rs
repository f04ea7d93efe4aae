//! Cache of compiled rule expressions, keyed by the literal rule text.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::CacheConfig;
use crate::expression::{compile, CompileError, CompiledExpression};

/// A bounded, thread-safe cache of compiled expressions.
///
/// Identical text always compiles to an equivalent expression, so the text is
/// the whole key. Rules that fail to compile are never cached.
#[derive(Clone)]
pub struct ExpressionCache {
    cache: Cache<String, Arc<CompiledExpression>>,
}

impl ExpressionCache {
    /// Creates a new `ExpressionCache`.
    ///
    /// # Arguments
    /// * `max_capacity` - The maximum number of compiled expressions kept.
    /// * `time_to_idle` - Evict entries not read for this long, if set.
    pub fn new(max_capacity: u64, time_to_idle: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Some(tti) = time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        Self {
            cache: builder.build(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_capacity,
            config.time_to_idle_seconds.map(Duration::from_secs),
        )
    }

    /// Returns the compiled form of `rule`, compiling it on a miss.
    pub fn get_or_compile(&self, rule: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        if let Some(compiled) = self.cache.get(rule) {
            metrics::counter!("expression_cache_hits").increment(1);
            return Ok(compiled);
        }

        metrics::counter!("expression_cache_misses").increment(1);
        let compiled = Arc::new(compile(rule)?);
        debug!(rule, "Compiled rule expression");
        self.cache.insert(rule.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Checks if the compiled form of `rule` is currently cached.
    pub fn contains(&self, rule: &str) -> bool {
        self.cache.contains_key(rule)
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of cached expressions.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
