//! Rollout Harness: runs sample worlds through the search engine.
//!
//! The runner steps an engine under a budget and packages the outcome as a
//! deterministic, digestible run report. The harness does NOT implement any
//! search logic; it delegates to `rollout_search`. Worlds provide the
//! implicit graph only.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod canon;
pub mod contract;
pub mod report;
pub mod runner;
pub mod worlds;

pub use contract::HarnessWorld;
pub use report::{GraphSummaryV1, RunReportV1, RunTermination, SolutionRecordV1};
pub use runner::{run_search, ucb_engine, RunBudget, RunError};
