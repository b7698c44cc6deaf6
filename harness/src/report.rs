//! `RunReportV1`: deterministic summary of one harness run.
//!
//! The report holds no wall-clock data. Two runs of the same world with the
//! same seed, policies and budget produce byte-identical canonical JSON and
//! therefore the same [`RunReportV1::digest`]. States and actions are
//! recorded through their `Debug` rendering.

use std::fmt::Debug;

use rollout_search::{EngineStats, ExploredGraph, NodeStatus, Score, Solution};
use serde_json::json;

use crate::canon::{canonical_json_bytes, content_hash, DOMAIN_RUN_REPORT};

pub const RUN_REPORT_SCHEMA_VERSION: &str = "rollout.run_report.v1";

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunTermination {
    /// The reachable space was exhausted.
    Exhausted,
    /// `RunBudget::max_steps` was reached.
    StepBudget,
    /// `RunBudget::stop_after_solutions` was reached.
    SolutionLimit,
    Timeout,
    Canceled,
    Interrupted,
}

impl RunTermination {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::StepBudget => "step_budget",
            Self::SolutionLimit => "solution_limit",
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
            Self::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRecordV1 {
    /// 1-based step that produced the solution.
    pub step: u64,
    pub states: Vec<String>,
    pub actions: Vec<String>,
    pub score: f64,
}

impl SolutionRecordV1 {
    #[must_use]
    pub fn from_solution<N: Debug, A: Debug, V: Score>(step: u64, solution: &Solution<N, A, V>) -> Self {
        Self {
            step,
            states: solution.states.iter().map(|s| format!("{s:?}")).collect(),
            actions: solution.actions.iter().map(|a| format!("{a:?}")).collect(),
            score: solution.score.as_f64(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "actions": self.actions,
            "score": self.score,
            "states": self.states,
            "step": self.step,
        })
    }
}

/// Node counts per status at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphSummaryV1 {
    pub nodes: usize,
    pub frontier: usize,
    pub explicitly_added: usize,
    pub dead_leaves: usize,
    pub fully_explored: usize,
    pub degraded: usize,
}

impl GraphSummaryV1 {
    #[must_use]
    pub fn of<N, A>(graph: &ExploredGraph<N, A>) -> Self {
        Self {
            nodes: graph.len(),
            frontier: graph.count(NodeStatus::Frontier),
            explicitly_added: graph.count(NodeStatus::ExplicitlyAdded),
            dead_leaves: graph.count(NodeStatus::DeadLeaf),
            fully_explored: graph.count(NodeStatus::FullyExplored),
            degraded: graph
                .node_ids()
                .filter(|&id| graph.degraded_note(id).is_some())
                .count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReportV1 {
    pub world_id: String,
    pub world_parameters: serde_json::Value,
    pub termination: RunTermination,
    /// Calls to `step()` made by the runner, including the final one.
    pub steps: u64,
    pub stats: EngineStats,
    pub graph: GraphSummaryV1,
    pub solutions: Vec<SolutionRecordV1>,
    pub best: Option<SolutionRecordV1>,
}

impl RunReportV1 {
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let s = &self.stats;
        let g = &self.graph;
        json!({
            "best": self.best.as_ref().map(SolutionRecordV1::to_json),
            "graph": {
                "dead_leaves": g.dead_leaves,
                "degraded": g.degraded,
                "explicitly_added": g.explicitly_added,
                "frontier": g.frontier,
                "fully_explored": g.fully_explored,
                "nodes": g.nodes,
            },
            "schema_version": RUN_REPORT_SCHEMA_VERSION,
            "solutions": self.solutions.iter().map(SolutionRecordV1::to_json).collect::<Vec<_>>(),
            "stats": {
                "backpropagations": s.backpropagations,
                "cache_hits": s.cache_hits,
                "evaluation_failures": s.evaluation_failures,
                "evaluations": s.evaluations,
                "expansions": s.expansions,
                "merged_successors": s.merged_successors,
                "playouts": s.playouts,
                "restarts": s.restarts,
                "solutions": s.solutions,
            },
            "steps": self.steps,
            "termination": self.termination.as_str(),
            "world": {
                "id": self.world_id,
                "parameters": self.world_parameters,
            },
        })
    }

    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_json_bytes(&self.to_json())
    }

    /// `"sha256:<hex>"` over the canonical bytes.
    #[must_use]
    pub fn digest(&self) -> String {
        content_hash(DOMAIN_RUN_REPORT, &self.canonical_bytes())
    }
}
