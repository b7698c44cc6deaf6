//! Search engine: one playout per [`SearchEngine::step`].
//!
//! A playout runs selection (tree policy over tried children), expansion and
//! simulation (default policy over untried children) until it reaches a goal
//! or a dead end, then scores the path and back-propagates the score. Every
//! node a playout touches stays in the explored graph.
//!
//! The engine owns its [`AlgorithmLifecycle`]. The first `step` activates it;
//! exhaustion or any error terminates it, after which `step` keeps returning
//! the same final outcome.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rollout_lifecycle::{
    AlgorithmError, AlgorithmLifecycle, AlgorithmState, CancelHandle, GuardedError,
    InterruptRegistry,
};

use crate::config::EngineConfig;
use crate::contract::SearchProblem;
use crate::error::SearchError;
use crate::graph::{ExploredGraph, NodeId};
use crate::observer::{notify, NodeLabel, NoopObserver, SearchObserver};
use crate::policy::{DefaultPolicy, TreePolicy};
use crate::scorer::{EvaluationError, PathEvaluator, Score};

/// A newly scored path that ends in a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<N, A, V> {
    /// Root to goal, inclusive.
    pub states: Vec<N>,
    /// `actions[i]` leads from `states[i]` to `states[i + 1]`.
    pub actions: Vec<A>,
    pub score: V,
}

/// Result of one [`SearchEngine::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<N, A, V> {
    Solution(Solution<N, A, V>),
    /// The playout ended in a dead end, reused a cached score, or was
    /// scored with the failure penalty.
    NoSolution { score: V },
    /// The root is fully explored or dead; nothing is left to search.
    Exhausted,
}

/// Running counters. Monotonic for the lifetime of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub playouts: u64,
    /// Playouts restarted from the root after selection hit a node with no
    /// viable child.
    pub restarts: u64,
    pub expansions: u64,
    pub evaluations: u64,
    pub cache_hits: u64,
    /// Successor actions dropped because an earlier sibling reached the same
    /// state.
    pub merged_successors: u64,
    pub evaluation_failures: u64,
    pub backpropagations: u64,
    pub solutions: u64,
}

type BoxedTreePolicy<P, V> =
    Box<dyn TreePolicy<<P as SearchProblem>::State, <P as SearchProblem>::Action, V>>;
type BoxedDefaultPolicy<P> =
    Box<dyn DefaultPolicy<<P as SearchProblem>::State, <P as SearchProblem>::Action>>;
type BoxedEvaluator<P, V> = Box<dyn PathEvaluator<<P as SearchProblem>::State, V>>;
type BoxedObserver<P, V> =
    Box<dyn SearchObserver<<P as SearchProblem>::State, <P as SearchProblem>::Action, V>>;

/// A finished playout: the node path and its last node.
struct Playout {
    nodes: Vec<NodeId>,
    terminal: NodeId,
}

pub struct SearchEngine<P: SearchProblem, V: Score> {
    problem: P,
    tree_policy: BoxedTreePolicy<P, V>,
    default_policy: BoxedDefaultPolicy<P>,
    evaluator: BoxedEvaluator<P, V>,
    observer: BoxedObserver<P, V>,
    config: EngineConfig<V>,
    lifecycle: AlgorithmLifecycle,
    graph: ExploredGraph<P::State, P::Action>,
    root: NodeId,
    score_cache: HashMap<Vec<P::State>, V>,
    stats: EngineStats,
    consecutive_failures: u64,
    best: Option<Solution<P::State, P::Action, V>>,
    /// Final error once the lifecycle is inactive; `None` means exhaustion.
    termination: Option<SearchError>,
}

impl<P: SearchProblem, V: Score> SearchEngine<P, V> {
    /// Build an engine and seed its graph with the problem's root.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if `config` fails validation.
    pub fn new<T, D, E>(
        problem: P,
        tree_policy: T,
        default_policy: D,
        evaluator: E,
        config: EngineConfig<V>,
    ) -> Result<Self, SearchError>
    where
        T: TreePolicy<P::State, P::Action, V> + 'static,
        D: DefaultPolicy<P::State, P::Action> + 'static,
        E: PathEvaluator<P::State, V> + 'static,
    {
        config.validate()?;
        let mut graph = ExploredGraph::new();
        let root = graph.add_node(problem.root());
        Ok(Self {
            problem,
            tree_policy: Box::new(tree_policy),
            default_policy: Box::new(default_policy),
            evaluator: Box::new(evaluator),
            observer: Box::new(NoopObserver),
            lifecycle: AlgorithmLifecycle::new(config.lifecycle.clone()),
            config,
            graph,
            root,
            score_cache: HashMap::new(),
            stats: EngineStats::default(),
            consecutive_failures: 0,
            best: None,
            termination: None,
        })
    }

    #[must_use]
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: SearchObserver<P::State, P::Action, V> + 'static,
    {
        self.observer = Box::new(observer);
        self
    }

    /// Use `registry` instead of the process-wide interrupt registry.
    ///
    /// Replaces the lifecycle, so call it before handing out cancel handles.
    #[must_use]
    pub fn with_interrupt_registry(mut self, registry: Arc<InterruptRegistry>) -> Self {
        self.lifecycle = AlgorithmLifecycle::with_registry(self.config.lifecycle.clone(), registry);
        self
    }

    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig<V> {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &ExploredGraph<P::State, P::Action> {
        &self.graph
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[must_use]
    pub fn lifecycle(&self) -> &AlgorithmLifecycle {
        &self.lifecycle
    }

    /// Handle for canceling this engine from another thread.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.lifecycle.cancel_handle()
    }

    /// Best solution so far under the configured objective.
    #[must_use]
    pub fn best_solution(&self) -> Option<&Solution<P::State, P::Action, V>> {
        self.best.as_ref()
    }

    /// The cached score of `path`, if it was scored successfully.
    #[must_use]
    pub fn cached_score(&self, path: &[P::State]) -> Option<V> {
        self.score_cache.get(path).copied()
    }

    /// Whether the search finished by exhausting the reachable space.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.lifecycle.state() == AlgorithmState::Inactive && self.termination.is_none()
    }

    /// The error that stopped the search, if it stopped on one.
    #[must_use]
    pub fn termination(&self) -> Option<&SearchError> {
        self.termination.as_ref()
    }

    /// Run one playout.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Terminated`] when the lifecycle raises `Timeout`,
    ///   `Canceled` or `Interrupted`
    /// - any contract or invariant violation listed on [`SearchError`]
    ///
    /// Every error terminates the search; later calls return it again.
    pub fn step(&mut self) -> Result<StepOutcome<P::State, P::Action, V>, SearchError> {
        match self.lifecycle.state() {
            AlgorithmState::Created => self.initialize()?,
            AlgorithmState::Active => {}
            AlgorithmState::Inactive => {
                return match &self.termination {
                    Some(err) => Err(err.clone()),
                    None => Ok(StepOutcome::Exhausted),
                };
            }
        }

        let outcome = self.playout().and_then(|playout| match playout {
            Some(playout) => {
                self.stats.playouts += 1;
                self.score(playout)
            }
            None => Ok(StepOutcome::Exhausted),
        });
        match outcome {
            Ok(StepOutcome::Exhausted) => {
                self.finish(None);
                Ok(StepOutcome::Exhausted)
            }
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.finish(Some(err.clone()));
                Err(err)
            }
        }
    }

    /// Step until the next solution. `Ok(None)` means the search is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`SearchEngine::step`].
    pub fn next_solution(
        &mut self,
    ) -> Result<Option<Solution<P::State, P::Action, V>>, SearchError> {
        loop {
            match self.step()? {
                StepOutcome::Solution(solution) => return Ok(Some(solution)),
                StepOutcome::NoSolution { .. } => {}
                StepOutcome::Exhausted => return Ok(None),
            }
        }
    }

    fn initialize(&mut self) -> Result<(), SearchError> {
        let event = self.lifecycle.activate()?;
        tracing::debug!(?event, root = %self.root, "search initialized");
        let root = self.graph.state(self.root);
        let observer = &mut self.observer;
        notify("graph_initialized", || observer.on_graph_initialized(root));
        Ok(())
    }

    fn finish(&mut self, error: Option<SearchError>) {
        match &error {
            None => tracing::info!(
                algorithm = %self.lifecycle.id(),
                playouts = self.stats.playouts,
                solutions = self.stats.solutions,
                "search exhausted"
            ),
            Some(err) => tracing::info!(
                algorithm = %self.lifecycle.id(),
                playouts = self.stats.playouts,
                error = %err,
                "search stopped"
            ),
        }
        self.termination = error;
        self.lifecycle.terminate();
    }

    fn checkpoint(&self) -> Result<(), SearchError> {
        self.lifecycle
            .check_and_conduct_termination()
            .map_err(SearchError::from)
    }

    /// Selection, expansion and simulation. `None` means exhausted.
    fn playout(&mut self) -> Result<Option<Playout>, SearchError> {
        'restart: loop {
            self.checkpoint()?;
            let root = self.root;
            if self.graph.is_fully_explored(root) || self.graph.is_dead_leaf(root) {
                return Ok(None);
            }

            let mut nodes = vec![root];
            let mut current = root;
            if self.is_goal(current) {
                self.close_goal(current);
                return Ok(Some(Playout {
                    nodes,
                    terminal: current,
                }));
            }

            // Selection: descend through tried children.
            while !self.graph.is_frontier(current) && self.untried_children(current).is_empty() {
                let candidates = self.viable_children(current);
                if candidates.is_empty() {
                    self.mark_dead_leaf(current);
                    self.stats.restarts += 1;
                    tracing::trace!(node = %current, "no viable child, restarting playout");
                    continue 'restart;
                }
                current = self.choose_tried(current, &candidates)?;
                nodes.push(current);
                if self.is_goal(current) {
                    self.close_goal(current);
                    return Ok(Some(Playout {
                        nodes,
                        terminal: current,
                    }));
                }
            }

            // Expansion, then simulation. The first pass expands the node
            // selection stopped at; later passes continue from the child just
            // added.
            loop {
                if self.graph.is_frontier(current) {
                    self.expand(current)?;
                }
                let untried = self.untried_children(current);
                if untried.is_empty() {
                    self.mark_dead_leaf(current);
                    return Ok(Some(Playout {
                        nodes,
                        terminal: current,
                    }));
                }
                current = self.choose_untried(current, &untried)?;
                if self.graph.mark_explicitly_added(current) {
                    self.emit_status(current, NodeLabel::ExplicitlyAdded);
                }
                nodes.push(current);
                if self.is_goal(current) {
                    self.close_goal(current);
                    return Ok(Some(Playout {
                        nodes,
                        terminal: current,
                    }));
                }
                self.checkpoint()?;
            }
        }
    }

    fn is_goal(&self, node: NodeId) -> bool {
        self.problem.is_goal(self.graph.state(node))
    }

    /// Children still eligible for selection: not dead, and not fully
    /// explored when double paths are forbidden.
    fn viable_children(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .successors_of(node)
            .iter()
            .copied()
            .filter(|&child| self.is_viable(child))
            .collect()
    }

    /// Viable children that no playout has stepped onto yet.
    fn untried_children(&self, node: NodeId) -> Vec<NodeId> {
        self.graph
            .successors_of(node)
            .iter()
            .copied()
            .filter(|&child| self.is_viable(child) && !self.graph.is_explicitly_added(child))
            .collect()
    }

    fn is_viable(&self, node: NodeId) -> bool {
        !self.graph.is_dead_leaf(node)
            && !(self.config.forbid_double_paths && self.graph.is_fully_explored(node))
    }

    fn expand(&mut self, node: NodeId) -> Result<(), SearchError> {
        self.checkpoint()?;
        let successors = self.problem.successors(self.graph.state(node));
        {
            let mut seen = HashSet::with_capacity(successors.len());
            if let Some((action, _)) = successors.iter().find(|(a, _)| !seen.insert(a)) {
                return Err(SearchError::DuplicateAction {
                    node,
                    action: format!("{action:?}"),
                });
            }
        }

        // One child per distinct state. The first action to reach a state
        // owns the edge; later siblings with that state are dropped so a path
        // of states names exactly one node.
        let mut states = HashSet::with_capacity(successors.len());
        let mut count = 0;
        for (action, state) in successors {
            if !states.insert(state.clone()) {
                self.stats.merged_successors += 1;
                tracing::trace!(%node, ?action, ?state, "sibling reaches a known state, merged");
                continue;
            }
            count += 1;
            let child = self.graph.add_successor(node, action, state)?;
            let parent = self.graph.state(node);
            let child_state = self.graph.state(child);
            let observer = &mut self.observer;
            notify("node_added", || {
                observer.on_node_added(parent, child_state, NodeLabel::Frontier);
            });
        }
        self.graph.mark_expanded(node);
        self.stats.expansions += 1;
        tracing::trace!(%node, successors = count, "expanded");
        Ok(())
    }

    fn choose_tried(&mut self, node: NodeId, candidates: &[NodeId]) -> Result<NodeId, SearchError> {
        let choices = self.graph.choices(candidates);
        let action = self
            .tree_policy
            .select_action(self.graph.state(node), &choices);
        self.child_for(candidates, &action)
            .ok_or(SearchError::PolicyContractViolation { policy: "tree" })
    }

    fn choose_untried(&mut self, node: NodeId, candidates: &[NodeId]) -> Result<NodeId, SearchError> {
        let choices = self.graph.choices(candidates);
        let action = self
            .default_policy
            .select_action(self.graph.state(node), &choices);
        self.child_for(candidates, &action)
            .ok_or(SearchError::PolicyContractViolation { policy: "default" })
    }

    fn child_for(&self, candidates: &[NodeId], action: &P::Action) -> Option<NodeId> {
        candidates
            .iter()
            .copied()
            .find(|&child| self.graph.incoming_action(child) == Some(action))
    }

    /// A goal ends the playout and is never extended, so it is fully explored.
    fn close_goal(&mut self, node: NodeId) {
        for marked in self.graph.mark_fully_explored(node) {
            self.emit_status(marked, NodeLabel::FullyExplored);
        }
    }

    fn mark_dead_leaf(&mut self, node: NodeId) {
        if self.graph.mark_dead_leaf(node) {
            self.emit_status(node, NodeLabel::DeadLeaf);
        }
        if self.graph.all_children_fully_explored(node) {
            for marked in self.graph.mark_fully_explored(node) {
                self.emit_status(marked, NodeLabel::FullyExplored);
            }
        }
    }

    fn emit_status(&mut self, node: NodeId, label: NodeLabel) {
        tracing::trace!(%node, %label, "node status changed");
        let state = self.graph.state(node);
        let observer = &mut self.observer;
        notify("node_status_changed", || {
            observer.on_node_status_changed(state, label);
        });
    }

    fn score(
        &mut self,
        playout: Playout,
    ) -> Result<StepOutcome<P::State, P::Action, V>, SearchError> {
        let Playout { nodes, terminal } = playout;
        let states: Vec<P::State> = nodes.iter().map(|&id| self.graph.state(id).clone()).collect();

        if let Some(&cached) = self.score_cache.get(&states) {
            if self.config.forbid_double_paths {
                return Err(SearchError::DoublePathScored {
                    path: format!("{states:?}"),
                });
            }
            self.stats.cache_hits += 1;
            self.backpropagate(&states, cached);
            tracing::debug!(depth = nodes.len() - 1, "playout reused cached score");
            return Ok(StepOutcome::NoSolution { score: cached });
        }

        self.stats.evaluations += 1;
        let evaluator = &mut self.evaluator;
        let evaluation = self
            .lifecycle
            .compute_timeout_aware(|flag| evaluator.evaluate(&states, flag));

        match evaluation {
            Ok(score) => {
                self.consecutive_failures = 0;
                self.score_cache.insert(states.clone(), score);
                self.backpropagate(&states, score);
                if !self.is_goal(terminal) {
                    tracing::debug!(?score, depth = nodes.len() - 1, "playout ended in a dead end");
                    return Ok(StepOutcome::NoSolution { score });
                }
                let solution = Solution {
                    actions: nodes
                        .iter()
                        .skip(1)
                        .filter_map(|&id| self.graph.incoming_action(id).cloned())
                        .collect(),
                    states,
                    score,
                };
                self.record_solution(&solution);
                Ok(StepOutcome::Solution(solution))
            }
            Err(GuardedError::Work(EvaluationError::Failed { reason })) => {
                self.stats.evaluation_failures += 1;
                self.consecutive_failures += 1;
                tracing::warn!(
                    node = %terminal,
                    consecutive = self.consecutive_failures,
                    %reason,
                    "path evaluation failed, using penalty score"
                );
                self.graph.mark_degraded(terminal, reason.clone());
                self.emit_status(terminal, NodeLabel::Degraded);
                if let Some(limit) = self.config.max_consecutive_evaluation_failures {
                    if self.consecutive_failures >= limit {
                        return Err(SearchError::EvaluationFailuresExhausted {
                            failures: self.consecutive_failures,
                            last: EvaluationError::Failed { reason },
                        });
                    }
                }
                let penalty = self.config.failure_penalty;
                self.backpropagate(&states, penalty);
                Ok(StepOutcome::NoSolution { score: penalty })
            }
            // Interrupted, but the lifecycle found no pending signal to explain it.
            Err(GuardedError::Work(EvaluationError::Interrupted)) => {
                Err(SearchError::Terminated(AlgorithmError::Interrupted))
            }
            Err(GuardedError::Terminated(signal)) => Err(signal.into()),
        }
    }

    fn backpropagate(&mut self, states: &[P::State], score: V) {
        self.tree_policy.update_path(states, score);
        self.stats.backpropagations += 1;
    }

    fn record_solution(&mut self, solution: &Solution<P::State, P::Action, V>) {
        self.stats.solutions += 1;
        let improved = match &self.best {
            None => true,
            Some(best) => self.config.objective.is_better(&solution.score, &best.score),
        };
        if improved {
            self.best = Some(solution.clone());
        }
        tracing::debug!(score = ?solution.score, depth = solution.actions.len(), improved, "solution found");
        let observer = &mut self.observer;
        notify("solution_found", || observer.on_solution_found(solution));
    }
}

impl<P: SearchProblem, V: Score> Drop for SearchEngine<P, V> {
    fn drop(&mut self) {
        // Unregister the driver so a late cancel cannot interrupt the thread
        // on behalf of a dropped engine.
        if self.lifecycle.state() == AlgorithmState::Active {
            self.lifecycle.terminate();
        }
    }
}
