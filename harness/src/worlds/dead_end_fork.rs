//! `DeadEndFork`: one dead-end corridor next to a one-step goal.
//!
//! From the start the detour action is listed first, so a deterministic
//! first-choice policy walks the corridor before it finds the goal.

use rollout_search::SearchProblem;

use crate::contract::HarnessWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForkState {
    Start,
    /// Position `n` (1-based) inside the corridor.
    Corridor(u32),
    Goal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkMove {
    Detour,
    Advance,
    Finish,
}

#[derive(Debug, Clone, Copy)]
pub struct DeadEndFork {
    corridor_length: u32,
}

impl DeadEndFork {
    /// A corridor of `corridor_length` states (at least one).
    #[must_use]
    pub fn new(corridor_length: u32) -> Self {
        Self {
            corridor_length: corridor_length.max(1),
        }
    }
}

impl SearchProblem for DeadEndFork {
    type State = ForkState;
    type Action = ForkMove;

    fn root(&self) -> ForkState {
        ForkState::Start
    }

    fn successors(&self, state: &ForkState) -> Vec<(ForkMove, ForkState)> {
        match *state {
            ForkState::Start => vec![
                (ForkMove::Detour, ForkState::Corridor(1)),
                (ForkMove::Finish, ForkState::Goal),
            ],
            ForkState::Corridor(n) if n < self.corridor_length => {
                vec![(ForkMove::Advance, ForkState::Corridor(n + 1))]
            }
            ForkState::Corridor(_) | ForkState::Goal => Vec::new(),
        }
    }

    fn is_goal(&self, state: &ForkState) -> bool {
        *state == ForkState::Goal
    }
}

impl HarnessWorld for DeadEndFork {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "dead_end_fork"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "corridor_length": self.corridor_length })
    }
}
