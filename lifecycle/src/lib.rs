//! Rollout Lifecycle: the execution lifecycle every search algorithm runs on.
//!
//! # API Surface
//!
//! - [`lifecycle::AlgorithmLifecycle`] -- `Created -> Active -> Inactive` state
//!   machine with deadline bookkeeping, cancel/shutdown and
//!   [`lifecycle::AlgorithmLifecycle::check_and_conduct_termination`]
//! - [`interrupt::InterruptRegistry`] -- per-thread flags plus tagged,
//!   resolvable interrupts
//! - [`guard::DeadlineTimer`] -- one timer thread per lifecycle; each
//!   [`guard::DeadlineGuard`] it arms delivers one tagged interrupt
//!
//! # Module Dependency Direction
//!
//! `interrupt` ← `guard` ← `lifecycle`
//!
//! `config` and `error` are shared leaves.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod guard;
pub mod interrupt;
pub mod lifecycle;

pub use config::LifecycleConfig;
pub use error::{AlgorithmError, GuardedError, Interruption, LifecycleViolation};
pub use interrupt::{InterruptFlag, InterruptReason, InterruptRegistry, Interrupted};
pub use lifecycle::{AlgorithmId, AlgorithmLifecycle, AlgorithmState, CancelHandle, LifecycleEvent};
