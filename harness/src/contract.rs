//! World contract: what the harness needs beyond [`SearchProblem`].
//!
//! Worlds supply the implicit graph only. Policies, evaluation, budgets and
//! reporting are runner concerns.

use rollout_search::SearchProblem;

/// A search problem the harness can run and report on.
pub trait HarnessWorld: SearchProblem {
    /// Stable identifier recorded in run reports (e.g. `"binary_tree"`).
    fn world_id(&self) -> &str;

    /// World parameters recorded in run reports. Must be deterministic.
    fn parameters(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
