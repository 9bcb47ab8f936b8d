//! Error types for cgraph.

use crate::autodiff::NodeId;

/// Errors that can occur in tensor operations and graph evaluation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operand shapes are incompatible for the requested operation.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Index (or axis, or slice bound) outside the tensor's shape.
    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    /// Operation that is intentionally left unfinished.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An input node reachable from the output has no value in the feed.
    #[error("input node {id} has no value in the feed")]
    UnboundInput { id: NodeId },

    /// The node was never added to the graph being evaluated.
    #[error("node is not registered with this graph")]
    NodeNotInGraph,

    /// Reverse pass needs a forward activation that was not supplied.
    #[error("no forward activation for node {id}")]
    MissingActivation { id: NodeId },

    /// Operation is not valid for the given arguments.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed tensor text literal.
    #[error("failed to parse tensor literal: {0}")]
    Parse(String),
}

impl Error {
    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
