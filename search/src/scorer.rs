//! Path scoring types and the evaluator contract.

use std::fmt::Debug;

use rollout_lifecycle::{InterruptFlag, Interrupted, Interruption};
use thiserror::Error;

/// A single scalar, totally ordered score.
///
/// `as_f64` feeds statistics in tree policies; it may lose precision for
/// very large integers.
pub trait Score: Copy + PartialOrd + Debug {
    fn as_f64(self) -> f64;
}

impl Score for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

impl Score for f32 {
    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Score for i32 {
    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Score for u32 {
    fn as_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Score for i64 {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Score for u64 {
    #[allow(clippy::cast_precision_loss)]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

/// Why a path could not be scored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Recoverable: the engine substitutes its penalty score.
    #[error("path evaluation failed: {reason}")]
    Failed { reason: String },
    /// The evaluator woke up from an interrupt.
    #[error("path evaluation was interrupted")]
    Interrupted,
}

impl EvaluationError {
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl From<Interrupted> for EvaluationError {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

impl Interruption for EvaluationError {
    fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Scores complete paths (root to terminal, inclusive).
///
/// Implementations that block should wait on `interrupt` (for example with
/// [`InterruptFlag::sleep`]) and return [`EvaluationError::Interrupted`] when
/// it is raised, so deadlines and cancellation take effect promptly. Retrying
/// is the evaluator's business; the engine never retries.
pub trait PathEvaluator<N, V> {
    /// # Errors
    ///
    /// [`EvaluationError::Failed`] for a recoverable failure,
    /// [`EvaluationError::Interrupted`] when woken by an interrupt.
    fn evaluate(&mut self, path: &[N], interrupt: &InterruptFlag) -> Result<V, EvaluationError>;
}

impl<N, V, F> PathEvaluator<N, V> for F
where
    F: FnMut(&[N], &InterruptFlag) -> Result<V, EvaluationError>,
{
    fn evaluate(&mut self, path: &[N], interrupt: &InterruptFlag) -> Result<V, EvaluationError> {
        self(path, interrupt)
    }
}

/// Scores a path by its number of edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLengthEvaluator;

impl<N> PathEvaluator<N, f64> for PathLengthEvaluator {
    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&mut self, path: &[N], _interrupt: &InterruptFlag) -> Result<f64, EvaluationError> {
        Ok(path.len().saturating_sub(1) as f64)
    }
}
