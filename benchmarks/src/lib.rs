//! Shared helpers for rollout benchmark suites.

use std::sync::Arc;

use rollout_harness::{ucb_engine, HarnessWorld};
use rollout_lifecycle::InterruptRegistry;
use rollout_search::{EngineConfig, EngineStats, Score, SearchEngine, SearchProblem, StepOutcome};

/// UCB engine over `world` with a private interrupt registry, so timing is
/// not skewed by contention on the process-wide one.
///
/// # Panics
///
/// Panics if the default engine config is rejected. Benchmark setup failures
/// are fatal.
pub fn prepare_engine<W>(world: W, seed: u64) -> SearchEngine<W, f64>
where
    W: HarnessWorld,
    W::State: 'static,
{
    ucb_engine(world, seed, EngineConfig::new(0.0))
        .expect("default config is valid")
        .with_interrupt_registry(Arc::new(InterruptRegistry::new()))
}

/// Step `engine` until it is exhausted or `max_steps` steps were taken.
///
/// # Panics
///
/// Panics if a step fails. The benchmark worlds never trigger an error.
pub fn run_steps<P: SearchProblem, V: Score>(
    engine: &mut SearchEngine<P, V>,
    max_steps: u64,
) -> EngineStats {
    for _ in 0..max_steps {
        if matches!(engine.step().expect("benchmark step failed"), StepOutcome::Exhausted) {
            break;
        }
    }
    engine.stats()
}
