//! `BinaryTree`: a full binary tree whose leaves are all goals.
//!
//! Nodes are `(depth, index)` with `index < 2^depth`. A tree with `levels`
//! levels has `2^(levels - 1)` leaves, each reachable by exactly one path.

use rollout_search::SearchProblem;

use crate::contract::HarnessWorld;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeNode {
    pub depth: u32,
    pub index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryTree {
    levels: u32,
}

impl BinaryTree {
    /// `levels` is clamped to `1..=63`.
    #[must_use]
    pub fn new(levels: u32) -> Self {
        Self {
            levels: levels.clamp(1, 63),
        }
    }

    #[must_use]
    pub fn levels(&self) -> u32 {
        self.levels
    }

    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        1 << (self.levels - 1)
    }
}

impl SearchProblem for BinaryTree {
    type State = TreeNode;
    type Action = Branch;

    fn root(&self) -> TreeNode {
        TreeNode { depth: 0, index: 0 }
    }

    fn successors(&self, state: &TreeNode) -> Vec<(Branch, TreeNode)> {
        if self.is_goal(state) {
            return Vec::new();
        }
        let depth = state.depth + 1;
        vec![
            (
                Branch::Left,
                TreeNode {
                    depth,
                    index: state.index * 2,
                },
            ),
            (
                Branch::Right,
                TreeNode {
                    depth,
                    index: state.index * 2 + 1,
                },
            ),
        ]
    }

    fn is_goal(&self, state: &TreeNode) -> bool {
        state.depth + 1 >= self.levels
    }
}

impl HarnessWorld for BinaryTree {
    #[allow(clippy::unnecessary_literal_bound)]
    fn world_id(&self) -> &str {
        "binary_tree"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "levels": self.levels })
    }
}
