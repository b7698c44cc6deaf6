//! Rollout Search: anytime playout search over implicit graphs.
//!
//! Depends on `rollout_lifecycle` for deadlines, cancellation and interrupt
//! disambiguation. It does NOT depend on `rollout_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! rollout_lifecycle  ←  rollout_search  ←  rollout_harness
//! (interrupts, state)   (graph, engine)    (runner, report, worlds)
//! ```
//!
//! # Key types
//!
//! - [`SearchEngine`] -- one playout per `step()`, score cache, solution events
//! - [`ExploredGraph`] -- arena graph with four status sets per node
//! - [`TreePolicy`] / [`DefaultPolicy`] -- informed and uninformed selection
//! - [`PathEvaluator`] -- interruptible path scoring
//! - [`SearchObserver`] -- best-effort progress callbacks
//! - [`SearchProblem`] -- root, successors and goal test supplied by the caller

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod contract;
pub mod error;
pub mod graph;
pub mod observer;
pub mod policy;
pub mod scorer;
pub mod search;

pub use config::{EngineConfig, Objective};
pub use contract::SearchProblem;
pub use error::SearchError;
pub use graph::{ExploredGraph, GraphError, NodeId, NodeStatus};
pub use observer::{NodeLabel, NoopObserver, SearchObserver};
pub use policy::{
    Choice, DefaultPolicy, FirstActionPolicy, TreePolicy, UcbTreePolicy, UniformRandomPolicy,
};
pub use scorer::{EvaluationError, PathEvaluator, PathLengthEvaluator, Score};
pub use search::{EngineStats, SearchEngine, Solution, StepOutcome};
