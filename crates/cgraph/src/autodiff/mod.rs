//! Reverse-mode automatic differentiation over a static graph.
//!
//! # Architecture
//!
//! ```text
//! Node (Rc handle) ──inputs──► Node ...        built bottom-up by the caller
//!        │
//!        ▼ Graph::add
//! Graph { nodes: Vec<Node>, inputs: Vec<Vec<NodeId>> }   ids in topological order
//!        │
//!        ├─ forward(output, feed)              -> Activations  (ascending ids)
//!        └─ reverse(output, feed, activations) -> Gradients    (descending ids)
//! ```
//!
//! The graph is built once and evaluated many times, typically once per
//! training step with a different feed. Activation and adjoint maps are
//! created fresh per call unless the caller passes one in.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use cgraph::{Graph, Node, Tensor};
//!
//! let x = Node::input(&[1, 2]);
//! let w = Node::variable(Tensor::from_vec(vec![0.5, -0.5], &[2, 1]).unwrap());
//! let y = Node::tanh(&Node::matrix_multiply(&x, &w).unwrap());
//!
//! let mut graph = Graph::new();
//! graph.add(&y);
//!
//! let feed = HashMap::from([(x.clone(), Tensor::ones(&[1, 2]))]);
//! let activations = graph.forward(&y, &feed).unwrap();
//! let grads = graph.reverse(&y, &feed, &activations).unwrap();
//! assert_eq!(grads[&w].shape(), &[2, 1]);
//! ```

mod backward;
mod forward;
mod graph;
mod node;
mod ops;
mod values;

pub use graph::{Graph, NodeId};
pub use node::{Node, Op};
pub use values::{Activations, Feed, Gradients, NodeValues};
