//! Shared fixtures for the lock tests.
//!
//! Everything here goes through the public APIs of `rollout_lifecycle`,
//! `rollout_search` and `rollout_harness`; nothing reaches into crate
//! internals.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use rollout_lifecycle::{InterruptFlag, InterruptRegistry};
use rollout_search::{
    EvaluationError, NodeLabel, NodeStatus, Score, SearchEngine, SearchObserver, SearchProblem,
    Solution,
};

/// Explicit edge list over `u32` states rooted at `0`.
#[derive(Debug, Clone, Default)]
pub struct TableProblem {
    pub edges: Vec<(u32, char, u32)>,
    pub goals: Vec<u32>,
}

impl TableProblem {
    /// Full binary tree with `levels` levels; node `k` has children `2k+1`
    /// and `2k+2`, and every leaf is a goal.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is zero or above 31.
    #[must_use]
    pub fn binary_tree(levels: u32) -> Self {
        assert!((1..32).contains(&levels), "levels out of range");
        let internal = (1_u32 << (levels - 1)) - 1;
        let total = (1_u32 << levels) - 1;
        let mut edges = Vec::new();
        for k in 0..internal {
            edges.push((k, 'L', 2 * k + 1));
            edges.push((k, 'R', 2 * k + 2));
        }
        Self {
            edges,
            goals: (internal..total).collect(),
        }
    }
}

impl SearchProblem for TableProblem {
    type State = u32;
    type Action = char;

    fn root(&self) -> u32 {
        0
    }

    fn successors(&self, state: &u32) -> Vec<(char, u32)> {
        self.edges
            .iter()
            .filter(|(from, _, _)| from == state)
            .map(|&(_, action, to)| (action, to))
            .collect()
    }

    fn is_goal(&self, state: &u32) -> bool {
        self.goals.contains(state)
    }
}

/// One observer callback, rendered with `Debug` states.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    GraphInitialized { root: String },
    NodeAdded { parent: String, child: String, label: NodeLabel },
    StatusChanged { node: String, label: NodeLabel },
    SolutionFound { states: Vec<String>, score: f64 },
}

/// Observer that appends every event to a shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    log: Rc<RefCell<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the log; stays valid after the observer moves into an engine.
    #[must_use]
    pub fn log(&self) -> Rc<RefCell<Vec<ObservedEvent>>> {
        Rc::clone(&self.log)
    }
}

impl<N: std::fmt::Debug, A, V: Score> SearchObserver<N, A, V> for RecordingObserver {
    fn on_graph_initialized(&mut self, root: &N) {
        self.log.borrow_mut().push(ObservedEvent::GraphInitialized {
            root: format!("{root:?}"),
        });
    }

    fn on_node_added(&mut self, parent: &N, child: &N, label: NodeLabel) {
        self.log.borrow_mut().push(ObservedEvent::NodeAdded {
            parent: format!("{parent:?}"),
            child: format!("{child:?}"),
            label,
        });
    }

    fn on_node_status_changed(&mut self, node: &N, label: NodeLabel) {
        self.log.borrow_mut().push(ObservedEvent::StatusChanged {
            node: format!("{node:?}"),
            label,
        });
    }

    fn on_solution_found(&mut self, solution: &Solution<N, A, V>) {
        self.log.borrow_mut().push(ObservedEvent::SolutionFound {
            states: solution.states.iter().map(|s| format!("{s:?}")).collect(),
            score: solution.score.as_f64(),
        });
    }
}

/// Evaluator that fails every path with a recoverable error.
pub fn always_failing<N>(_: &[N], _: &InterruptFlag) -> Result<f64, EvaluationError> {
    Err(EvaluationError::failed("evaluator offline"))
}

/// Evaluator that blocks for `delay` per path, waking early on interrupt.
pub fn sleeping_evaluator<N>(
    delay: Duration,
) -> impl FnMut(&[N], &InterruptFlag) -> Result<f64, EvaluationError> {
    move |path: &[N], flag: &InterruptFlag| {
        flag.sleep(delay)?;
        #[allow(clippy::cast_precision_loss)]
        let edges = path.len().saturating_sub(1) as f64;
        Ok(edges)
    }
}

/// Give `engine` a private interrupt registry so parallel tests never see
/// each other's interrupts.
#[must_use]
pub fn isolated<P: SearchProblem, V: Score>(engine: SearchEngine<P, V>) -> SearchEngine<P, V> {
    engine.with_interrupt_registry(Arc::new(InterruptRegistry::new()))
}

/// Status of every node, indexed by node id.
#[must_use]
pub fn status_snapshot<P: SearchProblem, V: Score>(
    engine: &SearchEngine<P, V>,
) -> Vec<[bool; 4]> {
    let graph = engine.graph();
    graph
        .node_ids()
        .map(|id| {
            [
                graph.has_status(id, NodeStatus::Frontier),
                graph.has_status(id, NodeStatus::ExplicitlyAdded),
                graph.has_status(id, NodeStatus::DeadLeaf),
                graph.has_status(id, NodeStatus::FullyExplored),
            ]
        })
        .collect()
}
