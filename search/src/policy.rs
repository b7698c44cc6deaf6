//! Tree and default policies.
//!
//! The tree policy makes informed choices among children that were already
//! tried and receives every playout score through
//! [`TreePolicy::update_path`]. The default policy makes uninformed choices
//! among untried children and has no update hook.
//!
//! The engine only ever offers non-empty candidate lists and treats an
//! action outside the offered list as a contract violation.

use std::collections::HashMap;
use std::hash::Hash;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::Objective;
use crate::scorer::Score;

/// One child offered to a policy.
#[derive(Debug)]
pub struct Choice<'a, N, A> {
    pub action: &'a A,
    pub child: &'a N,
}

impl<N, A> Clone for Choice<'_, N, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N, A> Copy for Choice<'_, N, A> {}

pub trait TreePolicy<N, A, V> {
    /// Pick one of `candidates` (never empty) at `node`.
    fn select_action(&mut self, node: &N, candidates: &[Choice<'_, N, A>]) -> A;

    /// Back-propagate `score` along every state of `path`.
    fn update_path(&mut self, path: &[N], score: V);
}

pub trait DefaultPolicy<N, A> {
    /// Pick one of `candidates` (never empty) at `node`.
    fn select_action(&mut self, node: &N, candidates: &[Choice<'_, N, A>]) -> A;
}

/// Visit statistics kept per state by [`UcbTreePolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisitStats {
    pub visits: u64,
    pub total: f64,
}

impl VisitStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        (self.visits > 0).then(|| self.total / self.visits as f64)
    }
}

/// UCB1 selection over per-state visit statistics.
///
/// Unvisited candidates are tried first, in offered order. Otherwise the
/// candidate maximizing `exploit + c * sqrt(ln(N) / n)` wins, where `exploit`
/// is the mean score (negated when minimizing). Ties keep the earlier
/// candidate.
#[derive(Debug, Clone)]
pub struct UcbTreePolicy<N> {
    exploration: f64,
    objective: Objective,
    stats: HashMap<N, VisitStats>,
}

impl<N: Eq + Hash> UcbTreePolicy<N> {
    /// Exploration constant `sqrt(2)`.
    #[must_use]
    pub fn new(objective: Objective) -> Self {
        Self::with_exploration(objective, std::f64::consts::SQRT_2)
    }

    #[must_use]
    pub fn with_exploration(objective: Objective, exploration: f64) -> Self {
        Self {
            exploration,
            objective,
            stats: HashMap::new(),
        }
    }

    #[must_use]
    pub fn stats(&self, state: &N) -> VisitStats {
        self.stats.get(state).copied().unwrap_or_default()
    }
}

impl<N, A, V> TreePolicy<N, A, V> for UcbTreePolicy<N>
where
    N: Clone + Eq + Hash,
    A: Clone,
    V: Score,
{
    #[allow(clippy::cast_precision_loss)]
    fn select_action(&mut self, node: &N, candidates: &[Choice<'_, N, A>]) -> A {
        let parent_visits = self.stats(node).visits.max(1) as f64;
        let mut best: Option<(f64, &A)> = None;
        for choice in candidates {
            let child = self.stats(choice.child);
            let Some(mean) = child.mean() else {
                return choice.action.clone();
            };
            let exploit = match self.objective {
                Objective::Minimize => -mean,
                Objective::Maximize => mean,
            };
            let value =
                exploit + self.exploration * (parent_visits.ln() / child.visits as f64).sqrt();
            match best {
                Some((top, _)) if value <= top => {}
                _ => best = Some((value, choice.action)),
            }
        }
        // Only reached with a non-empty candidate list.
        best.map_or_else(|| candidates[0].action.clone(), |(_, a)| a.clone())
    }

    fn update_path(&mut self, path: &[N], score: V) {
        let value = score.as_f64();
        for state in path {
            let entry = self.stats.entry(state.clone()).or_default();
            entry.visits += 1;
            entry.total += value;
        }
    }
}

/// Uniform random choice driven by a seeded ChaCha generator.
#[derive(Debug, Clone)]
pub struct UniformRandomPolicy {
    rng: ChaCha8Rng,
}

impl UniformRandomPolicy {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<N, A: Clone> DefaultPolicy<N, A> for UniformRandomPolicy {
    fn select_action(&mut self, _node: &N, candidates: &[Choice<'_, N, A>]) -> A {
        let index = self.rng.gen_range(0..candidates.len());
        candidates[index].action.clone()
    }
}

/// Always picks the first offered candidate. Deterministic; useful as a
/// default policy for reproducible runs and as a tree policy baseline.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstActionPolicy;

impl<N, A: Clone> DefaultPolicy<N, A> for FirstActionPolicy {
    fn select_action(&mut self, _node: &N, candidates: &[Choice<'_, N, A>]) -> A {
        candidates[0].action.clone()
    }
}

impl<N, A: Clone, V> TreePolicy<N, A, V> for FirstActionPolicy {
    fn select_action(&mut self, _node: &N, candidates: &[Choice<'_, N, A>]) -> A {
        candidates[0].action.clone()
    }

    fn update_path(&mut self, _path: &[N], _score: V) {}
}
