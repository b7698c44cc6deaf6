//! `BoundedCounter`: reach `target` from 0 with `+1` and `*2` moves.
//!
//! A move is only offered while the result stays within `limit` and fewer
//! than `max_moves` moves were made, so the reachable space is finite and
//! contains dead ends. The move count is part of the state, which keeps
//! every path distinct.

use rollout_search::SearchProblem;

use crate::contract::HarnessWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterState {
    pub value: u32,
    pub moves: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterMove {
    Increment,
    Double,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedCounter {
    target: u32,
    limit: u32,
    max_moves: u32,
}

impl BoundedCounter {
    #[must_use]
    pub fn new(target: u32, limit: u32, max_moves: u32) -> Self {
        Self {
            target,
            limit: limit.max(target),
            max_moves,
        }
    }

    #[must_use]
    pub fn target(&self) -> u32 {
        self.target
    }
}

impl SearchProblem for BoundedCounter {
    type State = CounterState;
    type Action = CounterMove;

    fn root(&self) -> CounterState {
        CounterState { value: 0, moves: 0 }
    }

    fn successors(&self, state: &CounterState) -> Vec<(CounterMove, CounterState)> {
        if state.moves >= self.max_moves || self.is_goal(state) {
            return Vec::new();
        }
        let moves = state.moves + 1;
        let mut next = Vec::with_capacity(2);
        if state.value < self.limit {
            next.push((
                CounterMove::Increment,
                CounterState {
                    value: state.value + 1,
                    moves,
                },
            ));
        }
        // Doubling 0 goes nowhere and doubling 1 repeats the increment.
        if state.value > 1 && state.value <= self.limit / 2 {
            next.push((
                CounterMove::Double,
                CounterState {
                    value: state.value * 2,
                    moves,
                },
            ));
        }
        next
    }

    fn is_goal(&self, state: &CounterState) -> bool {
        state.value == self.target
    }
}

impl HarnessWorld for BoundedCounter {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "bounded_counter"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "limit": self.limit,
            "max_moves": self.max_moves,
            "target": self.target,
        })
    }
}
