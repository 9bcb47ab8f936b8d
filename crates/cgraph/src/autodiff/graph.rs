//! Graph arena: nodes indexed by insertion order.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use super::node::Node;
use crate::error::Error;

/// Position of a node in its [`Graph`].
///
/// Ids are dense and topological: every input of a node has a smaller id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the internal index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Directed acyclic graph of [`Node`]s.
///
/// The graph indexes nodes that already exist; it shares ownership with any
/// other holder of the same handles. Evaluation lives in
/// [`forward`](Graph::forward) and [`reverse`](Graph::reverse).
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    /// Input ids of each node, parallel to `nodes`.
    inputs: Vec<Vec<NodeId>>,
    index: HashMap<Node, NodeId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` and every ancestor not yet present.
    ///
    /// Ancestors are inserted depth-first in input order, each before its
    /// consumers. Adding a node that is already registered changes nothing
    /// and returns its existing id.
    ///
    /// # Example
    ///
    /// ```
    /// use cgraph::{Graph, Node};
    ///
    /// let x = Node::input(&[2]);
    /// let y = Node::tanh(&x);
    ///
    /// let mut graph = Graph::new();
    /// let id = graph.add(&y);
    /// assert_eq!(graph.len(), 2);
    /// assert!(graph.id_of(&x).unwrap() < id);
    /// assert_eq!(graph.add(&y), id);
    /// ```
    pub fn add(&mut self, node: &Node) -> NodeId {
        if let Some(&id) = self.index.get(node) {
            debug!("node {id} ({}) is already registered", node.op().tag());
            return id;
        }

        // (node, inputs_pushed)
        let mut stack = vec![(node.clone(), false)];
        while let Some((current, inputs_pushed)) = stack.pop() {
            if self.index.contains_key(&current) {
                continue;
            }
            if !inputs_pushed {
                stack.push((current.clone(), true));
                for input in current.inputs().iter().rev() {
                    if !self.index.contains_key(input) {
                        stack.push((input.clone(), false));
                    }
                }
                continue;
            }

            // Every input was popped and registered before this entry.
            let input_ids = current.inputs().iter().map(|input| self.index[input]).collect();
            let id = NodeId(self.nodes.len());
            debug!(
                "registered node {id} ({}) with shape {:?}",
                current.op().tag(),
                current.shape()
            );
            self.nodes.push(current.clone());
            self.inputs.push(input_ids);
            self.index.insert(current, id);
        }
        // The root entry is the first pushed and so the last registered.
        NodeId(self.nodes.len() - 1)
    }

    /// Id of `node`, if it has been added.
    pub fn id_of(&self, node: &Node) -> Option<NodeId> {
        self.index.get(node).copied()
    }

    pub(crate) fn require_id(&self, node: &Node) -> Result<NodeId, Error> {
        self.id_of(node).ok_or(Error::NodeNotInGraph)
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.index.contains_key(node)
    }

    /// Get node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Input ids of the node at `id`, in positional order.
    pub fn input_ids(&self, id: NodeId) -> Option<&[NodeId]> {
        self.inputs.get(id.0).map(Vec::as_slice)
    }

    pub(crate) fn inputs_of(&self, id: NodeId) -> &[NodeId] {
        &self.inputs[id.0]
    }

    /// All nodes in insertion (topological) order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids reachable from `root` through input edges, ascending.
    ///
    /// Descent stops at nodes for which `is_leaf` returns true; those nodes
    /// are still part of the result.
    pub(crate) fn reachable<F>(&self, root: NodeId, is_leaf: F) -> Vec<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        visited[root.0] = true;
        while let Some(id) = stack.pop() {
            if is_leaf(id) {
                continue;
            }
            for &input in &self.inputs[id.0] {
                if !visited[input.0] {
                    visited[input.0] = true;
                    stack.push(input);
                }
            }
        }
        visited
            .iter()
            .enumerate()
            .filter_map(|(i, &seen)| seen.then_some(NodeId(i)))
            .collect()
    }
}
