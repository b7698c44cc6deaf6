//! Sample worlds for the harness runner, lock tests and benchmarks.

pub mod binary_tree;
pub mod counter;
pub mod dead_end_fork;

pub use binary_tree::{BinaryTree, Branch, TreeNode};
pub use counter::{BoundedCounter, CounterMove, CounterState};
pub use dead_end_fork::{DeadEndFork, ForkMove, ForkState};
