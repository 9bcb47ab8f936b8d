//! Reverse-mode adjoint accumulation.

use log::{debug, trace};

use super::graph::Graph;
use super::node::Node;
use super::values::{Activations, Feed, Gradients};
use crate::error::Error;
use crate::tensor::Tensor;

impl Graph {
    /// Propagate adjoints from `output` back to every node it depends on.
    ///
    /// The seed is a tensor of ones shaped like `output`'s activation.
    /// Contributions from every consumer of a node are summed. Fed nodes are
    /// leaves: they receive an adjoint but do not pass it on. `activations`
    /// must come from a forward pass over the same feed.
    ///
    /// # Errors
    ///
    /// * `NodeNotInGraph` if `output` was never added
    /// * `MissingActivation` if a needed forward value is absent
    /// * any error raised by a node's adjoint rule
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use cgraph::{Graph, Node, Tensor};
    ///
    /// let x = Node::input(&[2]);
    /// let y = Node::power(&x, 2.0);
    /// let mut graph = Graph::new();
    /// graph.add(&y);
    ///
    /// let feed = HashMap::from([(x.clone(), Tensor::from_vec(vec![1.0, 3.0], &[2]).unwrap())]);
    /// let activations = graph.forward(&y, &feed).unwrap();
    /// let grads = graph.reverse(&y, &feed, &activations).unwrap();
    /// assert_eq!(grads[&x].data(), &[2.0, 6.0]);
    /// ```
    pub fn reverse(
        &self,
        output: &Node,
        feed: &Feed,
        activations: &Activations,
    ) -> Result<Gradients, Error> {
        self.reverse_with_cache(output, feed, activations, Gradients::new())
    }

    /// Like [`Graph::reverse`], accumulating into existing adjoints.
    ///
    /// The ones seed is only placed when `adjoints` is empty; otherwise the
    /// caller's entry for `output` (if any) is the starting adjoint.
    pub fn reverse_with_cache(
        &self,
        output: &Node,
        feed: &Feed,
        activations: &Activations,
        mut adjoints: Gradients,
    ) -> Result<Gradients, Error> {
        let out_id = self.require_id(output)?;
        if adjoints.is_empty() {
            let value = activations
                .get(output)
                .ok_or(Error::MissingActivation { id: out_id })?;
            adjoints.insert(output.clone(), Tensor::ones(value.shape()));
        }

        let nodes = self.nodes();
        let order = self.reachable(out_id, |id| feed.contains_key(&nodes[id.index()]));

        let mut adj: Vec<Option<Tensor>> = vec![None; self.len()];
        for &id in &order {
            adj[id.index()] = adjoints.remove(&nodes[id.index()]);
        }

        // Descending ids: every consumer of a node has a larger id, so its
        // adjoint is complete before it is propagated.
        let mut propagated = 0usize;
        for &id in order.iter().rev() {
            let node = &nodes[id.index()];
            let input_ids = self.inputs_of(id);
            if input_ids.is_empty() || feed.contains_key(node) {
                continue;
            }
            let (lower, upper) = adj.split_at_mut(id.index());
            let Some(node_adj) = upper[0].as_ref() else {
                continue;
            };

            let forward_inputs = input_ids
                .iter()
                .map(|&input| {
                    activations
                        .get(&nodes[input.index()])
                        .ok_or(Error::MissingActivation { id: input })
                })
                .collect::<Result<Vec<&Tensor>, Error>>()?;
            let contributions = node.op().adjoint(&forward_inputs, node_adj)?;
            trace!("reverse {id} ({}) -> {:?}", node.op().tag(), input_ids);

            for (&input, contribution) in input_ids.iter().zip(contributions) {
                let slot = &mut lower[input.index()];
                if let Some(existing) = slot.as_mut() {
                    existing.add_inplace(&contribution)?;
                } else {
                    *slot = Some(contribution);
                }
            }
            propagated += 1;
        }

        debug!(
            "reverse from {out_id}: {} nodes reachable, {propagated} propagated",
            order.len()
        );
        for id in order {
            if let Some(value) = adj[id.index()].take() {
                adjoints.insert(nodes[id.index()].clone(), value);
            }
        }
        Ok(adjoints)
    }
}
