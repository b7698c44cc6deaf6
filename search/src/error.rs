//! Typed search errors.
//!
//! Lifecycle signals (`Timeout`, `Canceled`, `Interrupted`) arrive wrapped in
//! [`SearchError::Terminated`]; everything else is either a pre-flight
//! rejection or a violated collaborator contract.

use rollout_lifecycle::{AlgorithmError, LifecycleViolation};
use thiserror::Error;

use crate::graph::{GraphError, NodeId};
use crate::scorer::EvaluationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Rejected by [`crate::config::EngineConfig::validate`].
    #[error("invalid engine configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleViolation),

    /// The lifecycle stopped the search.
    #[error("search terminated: {0}")]
    Terminated(#[from] AlgorithmError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The problem generated two successors with the same action label.
    #[error("duplicate action {action} among successors of {node}")]
    DuplicateAction { node: NodeId, action: String },

    /// A policy returned an action that was not among its candidates.
    #[error("{policy} policy chose an action outside the offered candidates")]
    PolicyContractViolation { policy: &'static str },

    /// A path was about to be scored a second time with double paths forbidden.
    #[error("path {path} was scored twice although double paths are forbidden")]
    DoublePathScored { path: String },

    /// The consecutive evaluation failure limit was reached.
    #[error("{failures} consecutive evaluation failures, last: {last}")]
    EvaluationFailuresExhausted { failures: u64, last: EvaluationError },
}

impl SearchError {
    /// Whether this is a lifecycle termination signal rather than a fault.
    #[must_use]
    pub fn is_termination(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}
