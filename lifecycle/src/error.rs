//! Typed lifecycle errors.
//!
//! [`AlgorithmError`] carries the three termination signals that unwind to
//! the driver. [`LifecycleViolation`] is a programming error and is never
//! handled inside the crate.

use std::time::Duration;

use thiserror::Error;

use crate::interrupt::Interrupted;
use crate::lifecycle::AlgorithmState;

/// A termination signal raised at an interruptible point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlgorithmError {
    /// The deadline passed.
    #[error("algorithm timed out {overrun:?} past its deadline")]
    Timeout { overrun: Duration },
    /// Cancellation was requested.
    #[error("algorithm was canceled {since_cancel:?} ago")]
    Canceled { since_cancel: Duration },
    /// The driver thread was interrupted for a reason the algorithm does not own.
    #[error("algorithm thread was interrupted")]
    Interrupted,
}

/// An operation was invoked in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal lifecycle transition: `{operation}` is not allowed in state {state}")]
pub struct LifecycleViolation {
    pub operation: &'static str,
    pub state: AlgorithmState,
}

/// Invalid [`crate::config::LifecycleConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("timeout precaution offset {offset:?} must be smaller than the timeout {timeout:?}")]
    PrecautionOffsetTooLarge { offset: Duration, timeout: Duration },
}

/// Errors that can report "the work was interrupted".
///
/// [`crate::lifecycle::AlgorithmLifecycle::compute_timeout_aware`] uses this to
/// decide which failures need interrupt disambiguation.
pub trait Interruption {
    fn is_interruption(&self) -> bool;
}

impl Interruption for Interrupted {
    fn is_interruption(&self) -> bool {
        true
    }
}

/// Outcome of guarded work that did not succeed.
#[derive(Debug, Error)]
pub enum GuardedError<E> {
    /// The lifecycle turned an interruption into a termination signal.
    #[error(transparent)]
    Terminated(#[from] AlgorithmError),
    /// The work failed on its own, or was interrupted from outside and the
    /// lifecycle had nothing to add.
    #[error("{0}")]
    Work(E),
}
