//! `ExploredGraph`: arena-backed record of every state the engine visited.
//!
//! Nodes live in one growable vector and are addressed by [`NodeId`]. Edges
//! are only created by successor expansion, so every non-root node has exactly
//! one predecessor, stored as an index on the child. Node status is four
//! independent index sets rather than one enum per node.
//!
//! Uses `BTreeSet` (not `HashSet`) so status sets iterate in node order.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::policy::Choice;

/// Index of a node in its [`ExploredGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One of the four per-node status facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Successors not generated yet.
    Frontier,
    /// Endpoint of at least one playout step.
    ExplicitlyAdded,
    /// No viable action left. Permanent.
    DeadLeaf,
    /// Every child is fully explored. Permanent.
    FullyExplored,
}

/// Structural violation of the explored graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {child} already has predecessor {existing}")]
    PredecessorExists { child: NodeId, existing: NodeId },
    #[error("root {0} cannot be the target of an edge")]
    RootAsChild(NodeId),
    #[error("edge {0} -> {0} would be a self loop")]
    SelfLoop(NodeId),
}

#[derive(Debug, Clone)]
struct GraphNode<N, A> {
    state: N,
    /// Predecessor and the action that led here (`None` for the root and
    /// for nodes not linked yet).
    edge: Option<(NodeId, A)>,
    successors: Vec<NodeId>,
    depth: u32,
}

/// The explored part of the search space.
#[derive(Debug, Clone)]
pub struct ExploredGraph<N, A> {
    nodes: Vec<GraphNode<N, A>>,
    frontier: BTreeSet<NodeId>,
    explicitly_added: BTreeSet<NodeId>,
    dead_leaves: BTreeSet<NodeId>,
    fully_explored: BTreeSet<NodeId>,
    degraded: BTreeMap<NodeId, String>,
}

impl<N, A> Default for ExploredGraph<N, A> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            frontier: BTreeSet::new(),
            explicitly_added: BTreeSet::new(),
            dead_leaves: BTreeSet::new(),
            fully_explored: BTreeSet::new(),
            degraded: BTreeMap::new(),
        }
    }
}

impl<N, A> ExploredGraph<N, A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The first node ever added.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    /// Add an unlinked node. New nodes start on the frontier.
    pub fn add_node(&mut self, state: N) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            state,
            edge: None,
            successors: Vec::new(),
            depth: 0,
        });
        self.frontier.insert(id);
        id
    }

    /// Link `child` below `parent` via `action`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::UnknownNode`] if either endpoint is not in the graph
    /// - [`GraphError::RootAsChild`] if `child` is the root
    /// - [`GraphError::SelfLoop`] if `parent == child`
    /// - [`GraphError::PredecessorExists`] if `child` is already linked
    pub fn add_edge(&mut self, parent: NodeId, action: A, child: NodeId) -> Result<(), GraphError> {
        self.check(parent)?;
        self.check(child)?;
        if Some(child) == self.root() {
            return Err(GraphError::RootAsChild(child));
        }
        if parent == child {
            return Err(GraphError::SelfLoop(child));
        }
        if let Some((existing, _)) = &self.nodes[child.0].edge {
            return Err(GraphError::PredecessorExists {
                child,
                existing: *existing,
            });
        }
        let depth = self.nodes[parent.0].depth + 1;
        let node = &mut self.nodes[child.0];
        node.edge = Some((parent, action));
        node.depth = depth;
        self.nodes[parent.0].successors.push(child);
        Ok(())
    }

    /// Add `state` as a new child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownNode`] if `parent` is not in the graph;
    /// nothing is added in that case.
    pub fn add_successor(&mut self, parent: NodeId, action: A, state: N) -> Result<NodeId, GraphError> {
        self.check(parent)?;
        let child = self.add_node(state);
        self.add_edge(parent, action, child)?;
        Ok(child)
    }

    fn check(&self, node: NodeId) -> Result<(), GraphError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    /// # Panics
    ///
    /// Panics if `node` does not belong to this graph.
    #[must_use]
    pub fn state(&self, node: NodeId) -> &N {
        &self.nodes[node.0].state
    }

    /// Children in generation order.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to this graph.
    #[must_use]
    pub fn successors_of(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].successors
    }

    #[must_use]
    pub fn predecessor_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.edge.as_ref().map(|(p, _)| *p)
    }

    /// Number of recorded predecessors: 0 for the root, 1 for everything else.
    #[must_use]
    pub fn predecessor_count(&self, node: NodeId) -> usize {
        usize::from(self.predecessor_of(node).is_some())
    }

    /// The action on the edge into `node`.
    #[must_use]
    pub fn incoming_action(&self, node: NodeId) -> Option<&A> {
        self.nodes.get(node.0)?.edge.as_ref().map(|(_, a)| a)
    }

    #[must_use]
    pub fn depth(&self, node: NodeId) -> Option<u32> {
        self.nodes.get(node.0).map(|n| n.depth)
    }

    /// Policy view of `children`, in the given order. Children without an
    /// incoming edge are skipped.
    #[must_use]
    pub fn choices(&self, children: &[NodeId]) -> Vec<Choice<'_, N, A>> {
        children
            .iter()
            .filter_map(|&c| {
                let node = self.nodes.get(c.0)?;
                let (_, action) = node.edge.as_ref()?;
                Some(Choice {
                    action,
                    child: &node.state,
                })
            })
            .collect()
    }

    /// Node ids from the root down to `node`, inclusive.
    #[must_use]
    pub fn path_to(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.contains(node).then_some(node);
        while let Some(id) = current {
            path.push(id);
            current = self.predecessor_of(id);
        }
        path.reverse();
        path
    }

    #[must_use]
    pub fn has_status(&self, node: NodeId, status: NodeStatus) -> bool {
        match status {
            NodeStatus::Frontier => self.frontier.contains(&node),
            NodeStatus::ExplicitlyAdded => self.explicitly_added.contains(&node),
            NodeStatus::DeadLeaf => self.dead_leaves.contains(&node),
            NodeStatus::FullyExplored => self.fully_explored.contains(&node),
        }
    }

    #[must_use]
    pub fn is_frontier(&self, node: NodeId) -> bool {
        self.frontier.contains(&node)
    }

    #[must_use]
    pub fn is_explicitly_added(&self, node: NodeId) -> bool {
        self.explicitly_added.contains(&node)
    }

    #[must_use]
    pub fn is_dead_leaf(&self, node: NodeId) -> bool {
        self.dead_leaves.contains(&node)
    }

    #[must_use]
    pub fn is_fully_explored(&self, node: NodeId) -> bool {
        self.fully_explored.contains(&node)
    }

    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Number of nodes carrying `status`.
    #[must_use]
    pub fn count(&self, status: NodeStatus) -> usize {
        match status {
            NodeStatus::Frontier => self.frontier.len(),
            NodeStatus::ExplicitlyAdded => self.explicitly_added.len(),
            NodeStatus::DeadLeaf => self.dead_leaves.len(),
            NodeStatus::FullyExplored => self.fully_explored.len(),
        }
    }

    /// Take `node` off the frontier. Returns whether it was on it.
    pub fn mark_expanded(&mut self, node: NodeId) -> bool {
        self.frontier.remove(&node)
    }

    /// Returns whether the mark is new.
    pub fn mark_explicitly_added(&mut self, node: NodeId) -> bool {
        self.contains(node) && self.explicitly_added.insert(node)
    }

    /// Returns whether the mark is new.
    pub fn mark_dead_leaf(&mut self, node: NodeId) -> bool {
        self.contains(node) && self.dead_leaves.insert(node)
    }

    /// Whether `node` has been expanded and every child is fully explored.
    /// Vacuously true for an expanded node without children.
    #[must_use]
    pub fn all_children_fully_explored(&self, node: NodeId) -> bool {
        self.contains(node)
            && !self.is_frontier(node)
            && self
                .successors_of(node)
                .iter()
                .all(|c| self.fully_explored.contains(c))
    }

    /// Mark `node` fully explored and propagate upward.
    ///
    /// After marking a node, its predecessor is marked too if all of the
    /// predecessor's children are now fully explored, and so on towards the
    /// root. The walk stops at the first predecessor with an unexplored or not
    /// yet fully explored child. Returns the newly marked nodes, bottom up.
    pub fn mark_fully_explored(&mut self, node: NodeId) -> Vec<NodeId> {
        let mut marked = Vec::new();
        let mut current = self.contains(node).then_some(node);
        while let Some(id) = current {
            if !self.fully_explored.insert(id) {
                break;
            }
            marked.push(id);
            current = self
                .predecessor_of(id)
                .filter(|&p| self.all_children_fully_explored(p));
        }
        marked
    }

    /// Attach a diagnostic note to a node whose outcome was degraded.
    pub fn mark_degraded(&mut self, node: NodeId, note: impl Into<String>) {
        if self.contains(node) {
            self.degraded.insert(node, note.into());
        }
    }

    #[must_use]
    pub fn degraded_note(&self, node: NodeId) -> Option<&str> {
        self.degraded.get(&node).map(String::as_str)
    }

    /// Ids of all nodes, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }
}
