//! Search problem contract trait.

use std::fmt::Debug;
use std::hash::Hash;

/// An implicit graph: a root, a successor generator and a goal test.
///
/// # Contract
///
/// - `successors` must return pairwise-distinct actions for one state. The
///   engine treats a duplicate as a hard error and does not retry.
/// - Different actions may lead to equal states. Among siblings, the first
///   action to reach a state owns the edge and the rest are merged into it.
/// - `successors` and `is_goal` must be deterministic for a given state.
/// - States are never mutated by the engine; it clones them into its graph
///   and into path keys.
pub trait SearchProblem {
    type State: Clone + Eq + Hash + Debug;
    type Action: Clone + Eq + Hash + Debug;

    fn root(&self) -> Self::State;

    /// Every `(action, successor)` pair reachable in one step from `state`.
    fn successors(&self, state: &Self::State) -> Vec<(Self::Action, Self::State)>;

    fn is_goal(&self, state: &Self::State) -> bool;
}
