//! Best-effort observation of engine progress.
//!
//! Observers are injected at construction. They never influence the search:
//! every callback runs inside `catch_unwind`, and a panicking observer is
//! logged and otherwise ignored.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::graph::NodeStatus;
use crate::search::Solution;

/// Label attached to node events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    Frontier,
    ExplicitlyAdded,
    DeadLeaf,
    FullyExplored,
    /// The evaluator failed on a path ending here and the penalty was used.
    Degraded,
}

impl NodeLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frontier => "frontier",
            Self::ExplicitlyAdded => "explicitly_added",
            Self::DeadLeaf => "dead_leaf",
            Self::FullyExplored => "fully_explored",
            Self::Degraded => "degraded",
        }
    }
}

impl From<NodeStatus> for NodeLabel {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Frontier => Self::Frontier,
            NodeStatus::ExplicitlyAdded => Self::ExplicitlyAdded,
            NodeStatus::DeadLeaf => Self::DeadLeaf,
            NodeStatus::FullyExplored => Self::FullyExplored,
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callbacks for graph and solution events. All methods default to no-ops.
pub trait SearchObserver<N, A, V> {
    fn on_graph_initialized(&mut self, _root: &N) {}

    fn on_node_added(&mut self, _parent: &N, _child: &N, _label: NodeLabel) {}

    fn on_node_status_changed(&mut self, _node: &N, _label: NodeLabel) {}

    fn on_solution_found(&mut self, _solution: &Solution<N, A, V>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<N, A, V> SearchObserver<N, A, V> for NoopObserver {}

/// Run one observer callback, swallowing a panic.
pub(crate) fn notify(event: &'static str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::warn!(event, "search observer panicked; event dropped");
    }
}
