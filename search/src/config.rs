//! Engine configuration.
//!
//! `EngineConfig` is a plain value snapshot. [`EngineConfig::validate`] runs
//! once at engine construction; nothing is re-checked mid-search.

use rollout_lifecycle::LifecycleConfig;

use crate::error::SearchError;
use crate::scorer::Score;

/// Optimization direction for scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Objective {
    #[default]
    Minimize,
    Maximize,
}

impl Objective {
    /// Whether `candidate` strictly beats `incumbent`. Incomparable values
    /// (NaN) never win.
    #[must_use]
    pub fn is_better<V: PartialOrd>(self, candidate: &V, incumbent: &V) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig<V> {
    /// Never score the same path twice. Fully explored children stop being
    /// candidates, and a cache hit becomes an invariant violation.
    pub forbid_double_paths: bool,
    /// Score substituted when the evaluator fails recoverably.
    pub failure_penalty: V,
    pub objective: Objective,
    /// Abort after this many evaluation failures in a row. `None` never aborts.
    pub max_consecutive_evaluation_failures: Option<u64>,
    pub lifecycle: LifecycleConfig,
}

impl<V: Score> EngineConfig<V> {
    /// Defaults: double paths forbidden, minimizing, unlimited failures,
    /// default lifecycle.
    #[must_use]
    pub fn new(failure_penalty: V) -> Self {
        Self {
            forbid_double_paths: true,
            failure_penalty,
            objective: Objective::default(),
            max_consecutive_evaluation_failures: None,
            lifecycle: LifecycleConfig::default(),
        }
    }

    /// Pre-flight checks.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if the failure limit is zero or
    /// the lifecycle config is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_consecutive_evaluation_failures == Some(0) {
            return Err(SearchError::InvalidConfig {
                detail: "max_consecutive_evaluation_failures must be at least 1".into(),
            });
        }
        self.lifecycle
            .validate()
            .map_err(|err| SearchError::InvalidConfig {
                detail: err.to_string(),
            })
    }
}
