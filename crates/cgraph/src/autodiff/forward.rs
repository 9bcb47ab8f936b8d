//! Memoised forward evaluation.

use log::{debug, trace};

use super::graph::Graph;
use super::node::{Node, Op};
use super::values::{Activations, Feed};
use crate::error::Error;
use crate::tensor::Tensor;

impl Graph {
    /// Evaluate `output` and every node it depends on.
    ///
    /// A node present in `feed` takes the fed value and its own inputs are
    /// not visited, so any node (not only inputs) can be short-circuited.
    /// Each node is computed at most once.
    ///
    /// # Errors
    ///
    /// * `NodeNotInGraph` if `output` was never added
    /// * `UnboundInput` if a reachable input node has no fed value
    /// * any error raised by a node's forward rule
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use cgraph::{Graph, Node, Tensor};
    ///
    /// let x = Node::input(&[2]);
    /// let y = Node::constant_multiply(&x, 3.0);
    /// let mut graph = Graph::new();
    /// graph.add(&y);
    ///
    /// let feed = HashMap::from([(x.clone(), Tensor::ones(&[2]))]);
    /// let activations = graph.forward(&y, &feed).unwrap();
    /// assert_eq!(activations[&y].data(), &[3.0, 3.0]);
    /// ```
    pub fn forward(&self, output: &Node, feed: &Feed) -> Result<Activations, Error> {
        self.forward_with_cache(output, feed, Activations::new())
    }

    /// Like [`Graph::forward`], reusing activations from an earlier call.
    ///
    /// Entries in `cache` are trusted as they are; fed values take
    /// precedence over cached ones. The returned map contains the cache plus
    /// every node visited by this call.
    pub fn forward_with_cache(
        &self,
        output: &Node,
        feed: &Feed,
        mut cache: Activations,
    ) -> Result<Activations, Error> {
        let out_id = self.require_id(output)?;

        let nodes = self.nodes();
        let order = self.reachable(out_id, |id| {
            let node = &nodes[id.index()];
            feed.contains_key(node) || cache.contains(node)
        });

        let mut values: Vec<Option<Tensor>> = vec![None; self.len()];
        let mut computed = 0usize;
        for &id in &order {
            let node = &nodes[id.index()];
            let value = if let Some(fed) = feed.get(node) {
                cache.remove(node);
                fed.clone()
            } else if let Some(cached) = cache.remove(node) {
                cached
            } else if matches!(node.op(), Op::Input) {
                return Err(Error::UnboundInput { id });
            } else {
                let args = self
                    .inputs_of(id)
                    .iter()
                    .map(|&input| {
                        values[input.index()]
                            .as_ref()
                            .ok_or(Error::MissingActivation { id: input })
                    })
                    .collect::<Result<Vec<&Tensor>, Error>>()?;
                let value = node.op().forward(&args)?;
                trace!("forward {id} ({}) -> {:?}", node.op().tag(), value.shape());
                computed += 1;
                value
            };
            values[id.index()] = Some(value);
        }

        debug!(
            "forward to {out_id}: {} nodes reachable, {computed} computed",
            order.len()
        );
        for id in order {
            if let Some(value) = values[id.index()].take() {
                cache.insert(nodes[id.index()].clone(), value);
            }
        }
        Ok(cache)
    }

    /// Run [`Graph::forward`] and return only `output`'s value.
    pub fn get_output(&self, output: &Node, feed: &Feed) -> Result<Tensor, Error> {
        let id = self.require_id(output)?;
        let mut activations = self.forward(output, feed)?;
        activations
            .remove(output)
            .ok_or(Error::MissingActivation { id })
    }
}
