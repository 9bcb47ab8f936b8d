//! Per-call tensor maps keyed by node identity.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Index;

use super::node::Node;
use crate::error::Error;
use crate::tensor::Tensor;

/// Caller-supplied values for designated nodes, usually inputs.
pub type Feed = HashMap<Node, Tensor>;

/// Map from node to tensor produced by one forward or reverse pass.
#[derive(Debug, Clone, Default)]
pub struct NodeValues {
    values: HashMap<Node, Tensor>,
}

/// Forward activations, as returned by [`Graph::forward`](super::Graph::forward).
pub type Activations = NodeValues;

/// Accumulated adjoints, as returned by [`Graph::reverse`](super::Graph::reverse).
pub type Gradients = NodeValues;

impl NodeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &Node) -> Option<&Tensor> {
        self.values.get(node)
    }

    pub fn get_mut(&mut self, node: &Node) -> Option<&mut Tensor> {
        self.values.get_mut(node)
    }

    /// Store `value`, returning the previous entry.
    pub fn insert(&mut self, node: Node, value: Tensor) -> Option<Tensor> {
        self.values.insert(node, value)
    }

    /// Add `value` to the entry for `node`, or store it if there is none.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if an existing entry has a different shape.
    pub fn accumulate(&mut self, node: &Node, value: Tensor) -> Result<(), Error> {
        match self.values.entry(node.clone()) {
            Entry::Occupied(mut existing) => existing.get_mut().add_inplace(&value),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub fn remove(&mut self, node: &Node) -> Option<Tensor> {
        self.values.remove(node)
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.values.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Node, &Tensor)> {
        self.values.iter()
    }
}

impl Index<&Node> for NodeValues {
    type Output = Tensor;

    /// # Panics
    ///
    /// Panics if `node` has no entry; use [`NodeValues::get`] otherwise.
    fn index(&self, node: &Node) -> &Tensor {
        &self.values[node]
    }
}

impl FromIterator<(Node, Tensor)> for NodeValues {
    fn from_iter<I: IntoIterator<Item = (Node, Tensor)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for NodeValues {
    type Item = (Node, Tensor);
    type IntoIter = std::collections::hash_map::IntoIter<Node, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
