//! Binary that runs the sample worlds with fixed seeds and prints
//! deterministic output lines for cross-process verification.
//!
//! Usage: `report_fixture`
//!
//! Output: one `key=value` line per fact, prefixed with the world id.

use std::sync::Arc;

use rollout_harness::worlds::{BinaryTree, BoundedCounter};
use rollout_harness::{run_search, ucb_engine, HarnessWorld, RunBudget, RunReportV1};
use rollout_lifecycle::InterruptRegistry;
use rollout_search::EngineConfig;

fn run<W>(world: W, seed: u64, budget: &RunBudget) -> RunReportV1
where
    W: HarnessWorld,
    W::State: 'static,
{
    let mut engine = ucb_engine(world, seed, EngineConfig::new(100.0))
        .expect("fixture config is valid")
        .with_interrupt_registry(Arc::new(InterruptRegistry::new()));
    run_search(&mut engine, budget).expect("fixture run failed")
}

fn print_report(report: &RunReportV1) {
    let id = &report.world_id;
    println!("{id}.termination={}", report.termination.as_str());
    println!("{id}.steps={}", report.steps);
    println!("{id}.solutions={}", report.solutions.len());
    println!("{id}.nodes={}", report.graph.nodes);
    if let Some(best) = &report.best {
        println!("{id}.best_score={}", best.score);
    }
    println!("{id}.digest={}", report.digest());
}

fn main() {
    print_report(&run(BinaryTree::new(5), 11, &RunBudget::unlimited()));
    print_report(&run(BoundedCounter::new(13, 30, 8), 5, &RunBudget::steps(64)));
}
