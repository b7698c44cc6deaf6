//! Harness runner: drives a [`SearchEngine`] under a [`RunBudget`] and
//! packages the outcome as a [`RunReportV1`].
//!
//! # Pipeline
//!
//! ```text
//! RunBudget::validate() → [engine.step() × N] → stop condition
//!   → GraphSummaryV1::of(graph) → RunReportV1 (→ canonical JSON → digest)
//! ```
//!
//! Lifecycle terminations (`Timeout`, `Canceled`, `Interrupted`) are normal
//! ends of an anytime run and produce a report. Any other search error is a
//! fault and is returned as [`RunError::Search`].

use rollout_lifecycle::AlgorithmError;
use rollout_search::{
    EngineConfig, PathLengthEvaluator, Score, SearchEngine, SearchError, StepOutcome,
    UcbTreePolicy, UniformRandomPolicy,
};
use thiserror::Error;

use crate::contract::HarnessWorld;
use crate::report::{GraphSummaryV1, RunReportV1, RunTermination, SolutionRecordV1};

/// Step and solution limits for one run. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBudget {
    pub max_steps: Option<u64>,
    pub stop_after_solutions: Option<u64>,
}

impl RunBudget {
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`RunError::InvalidBudget`] if either limit is zero.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.max_steps == Some(0) {
            return Err(RunError::InvalidBudget {
                detail: "max_steps must be at least 1".into(),
            });
        }
        if self.stop_after_solutions == Some(0) {
            return Err(RunError::InvalidBudget {
                detail: "stop_after_solutions must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Error during a harness run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("invalid run budget: {detail}")]
    InvalidBudget { detail: String },
    /// The search stopped on a fault rather than a lifecycle signal.
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Engine with UCB selection, seeded uniform rollouts and path-length scoring.
///
/// # Errors
///
/// Returns [`SearchError::InvalidConfig`] if `config` fails validation.
pub fn ucb_engine<W>(
    world: W,
    seed: u64,
    config: EngineConfig<f64>,
) -> Result<SearchEngine<W, f64>, SearchError>
where
    W: HarnessWorld,
    W::State: 'static,
{
    let tree = UcbTreePolicy::new(config.objective);
    SearchEngine::new(
        world,
        tree,
        UniformRandomPolicy::seeded(seed),
        PathLengthEvaluator,
        config,
    )
}

/// Step `engine` until it stops or `budget` runs out.
///
/// The engine may already have been stepped; the report then covers only
/// the steps made here, while stats and graph cover the whole engine.
///
/// # Errors
///
/// - [`RunError::InvalidBudget`] if `budget` fails validation
/// - [`RunError::Search`] if the engine fails with anything other than a
///   lifecycle termination
pub fn run_search<W, V>(
    engine: &mut SearchEngine<W, V>,
    budget: &RunBudget,
) -> Result<RunReportV1, RunError>
where
    W: HarnessWorld,
    V: Score,
{
    budget.validate()?;

    let mut steps: u64 = 0;
    let mut found: u64 = 0;
    let mut solutions = Vec::new();
    let termination = loop {
        if budget.max_steps.is_some_and(|max| steps >= max) {
            break RunTermination::StepBudget;
        }
        steps += 1;
        match engine.step() {
            Ok(StepOutcome::Solution(solution)) => {
                solutions.push(SolutionRecordV1::from_solution(steps, &solution));
                found += 1;
                if budget.stop_after_solutions.is_some_and(|limit| found >= limit) {
                    break RunTermination::SolutionLimit;
                }
            }
            Ok(StepOutcome::NoSolution { .. }) => {}
            Ok(StepOutcome::Exhausted) => break RunTermination::Exhausted,
            Err(SearchError::Terminated(signal)) => {
                break match signal {
                    AlgorithmError::Timeout { .. } => RunTermination::Timeout,
                    AlgorithmError::Canceled { .. } => RunTermination::Canceled,
                    AlgorithmError::Interrupted => RunTermination::Interrupted,
                };
            }
            Err(err) => {
                tracing::warn!(world = engine.problem().world_id(), steps, error = %err, "run failed");
                return Err(err.into());
            }
        }
    };

    let objective = engine.config().objective;
    let mut best: Option<&SolutionRecordV1> = None;
    for record in &solutions {
        match best {
            Some(current) if !objective.is_better(&record.score, &current.score) => {}
            _ => best = Some(record),
        }
    }
    let best = best.cloned();

    tracing::info!(
        world = engine.problem().world_id(),
        termination = termination.as_str(),
        steps,
        solutions = found,
        "run finished"
    );
    Ok(RunReportV1 {
        world_id: engine.problem().world_id().to_string(),
        world_parameters: engine.problem().parameters(),
        termination,
        steps,
        stats: engine.stats(),
        graph: GraphSummaryV1::of(engine.graph()),
        solutions,
        best,
    })
}
