//! Graph nodes.
//!
//! A [`Node`] is a cheap, clonable handle to an immutable operation record:
//! the operation itself ([`Op`]), the nodes it reads from and its declared
//! output shape. Nodes are built bottom-up, each constructor taking its
//! inputs by reference, so any number of consumers can share an input.
//! Equality and hashing go by handle identity, never by value.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;
use std::rc::Rc;

use crate::error::Error;
use crate::operations::{concat_shape, contract_shape};
use crate::tensor::Tensor;

/// Operation performed by a node, with its variant-specific parameters.
#[derive(Debug)]
pub enum Op {
    /// Placeholder whose value must come from the feed.
    Input,
    /// Trainable leaf that owns its value.
    Variable(RefCell<Tensor>),
    Add,
    /// Sum of any number of same-shaped inputs.
    AddN,
    Subtract,
    ConstantAdd(f32),
    ConstantMultiply(f32),
    /// Hadamard product.
    ElementMultiply,
    /// Contraction of the left operand's last axis with the right's first.
    MatrixMultiply,
    Tanh,
    Sigmoid,
    Power(f32),
    Abs,
    /// Concatenation along the last axis.
    HStack,
    /// Identity forward; rescales the adjoint onto the unit L2 ball.
    GradientClip,
    /// Min-max normalization of every slice along `axis`.
    Normalize { axis: usize },
    /// Unfinished: evaluating it fails with `NotImplemented`.
    BroadcastAdd,
    /// Unfinished: evaluating it fails with `NotImplemented`.
    Convolution { stride: usize },
}

struct NodeData {
    op: Op,
    shape: Vec<usize>,
    inputs: Vec<Node>,
    name: RefCell<Option<String>>,
}

impl Drop for NodeData {
    // Iterative, so arbitrarily deep input chains drop without recursion.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.inputs);
        while let Some(Node(rc)) = pending.pop() {
            if let Ok(mut data) = Rc::try_unwrap(rc) {
                pending.append(&mut data.inputs);
            }
        }
    }
}

/// Shared handle to a computation node.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    fn new(op: Op, shape: Vec<usize>, inputs: Vec<Node>) -> Self {
        Node(Rc::new(NodeData {
            op,
            shape,
            inputs,
            name: RefCell::new(None),
        }))
    }

    fn same_shape(a: &Node, b: &Node) -> Result<(), Error> {
        if a.shape() != b.shape() {
            return Err(Error::shape_mismatch(a.shape(), b.shape()));
        }
        Ok(())
    }

    /// Placeholder for a value supplied at evaluation time.
    pub fn input(shape: &[usize]) -> Node {
        Node::new(Op::Input, shape.to_vec(), Vec::new())
    }

    /// Leaf owning `value`; its shape is the value's shape.
    pub fn variable(value: Tensor) -> Node {
        let shape = value.shape().to_vec();
        Node::new(Op::Variable(RefCell::new(value)), shape, Vec::new())
    }

    /// `a + b`, element-wise.
    pub fn add(a: &Node, b: &Node) -> Result<Node, Error> {
        Node::same_shape(a, b)?;
        Ok(Node::new(Op::Add, a.shape().to_vec(), vec![a.clone(), b.clone()]))
    }

    /// Element-wise sum of all `inputs`.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` when `inputs` is empty, `ShapeMismatch` when the
    /// shapes differ.
    pub fn add_n(inputs: &[Node]) -> Result<Node, Error> {
        let Some(first) = inputs.first() else {
            return Err(Error::InvalidOperation("add_n needs at least one input".into()));
        };
        for other in &inputs[1..] {
            Node::same_shape(first, other)?;
        }
        Ok(Node::new(Op::AddN, first.shape().to_vec(), inputs.to_vec()))
    }

    /// `a - b`, element-wise.
    pub fn subtract(a: &Node, b: &Node) -> Result<Node, Error> {
        Node::same_shape(a, b)?;
        Ok(Node::new(Op::Subtract, a.shape().to_vec(), vec![a.clone(), b.clone()]))
    }

    pub fn constant_add(a: &Node, c: f32) -> Node {
        Node::new(Op::ConstantAdd(c), a.shape().to_vec(), vec![a.clone()])
    }

    pub fn constant_multiply(a: &Node, c: f32) -> Node {
        Node::new(Op::ConstantMultiply(c), a.shape().to_vec(), vec![a.clone()])
    }

    /// `a ∘ b`, element-wise.
    pub fn element_multiply(a: &Node, b: &Node) -> Result<Node, Error> {
        Node::same_shape(a, b)?;
        Ok(Node::new(
            Op::ElementMultiply,
            a.shape().to_vec(),
            vec![a.clone(), b.clone()],
        ))
    }

    /// Contraction of `a`'s last axis with `b`'s first axis.
    ///
    /// The shape is `a.shape[..-1] ++ b.shape[1..]`.
    pub fn matrix_multiply(a: &Node, b: &Node) -> Result<Node, Error> {
        let shape = contract_shape(a.shape(), b.shape())?;
        Ok(Node::new(Op::MatrixMultiply, shape, vec![a.clone(), b.clone()]))
    }

    pub fn tanh(a: &Node) -> Node {
        Node::new(Op::Tanh, a.shape().to_vec(), vec![a.clone()])
    }

    pub fn sigmoid(a: &Node) -> Node {
        Node::new(Op::Sigmoid, a.shape().to_vec(), vec![a.clone()])
    }

    pub fn power(a: &Node, exponent: f32) -> Node {
        Node::new(Op::Power(exponent), a.shape().to_vec(), vec![a.clone()])
    }

    pub fn abs(a: &Node) -> Node {
        Node::new(Op::Abs, a.shape().to_vec(), vec![a.clone()])
    }

    /// Concatenation along the last axis.
    pub fn hstack(a: &Node, b: &Node) -> Result<Node, Error> {
        let shape = concat_shape(a.shape(), b.shape())?;
        Ok(Node::new(Op::HStack, shape, vec![a.clone(), b.clone()]))
    }

    pub fn gradient_clip(a: &Node) -> Node {
        Node::new(Op::GradientClip, a.shape().to_vec(), vec![a.clone()])
    }

    /// Min-max normalization of each slice along `axis`.
    pub fn normalize(a: &Node, axis: usize) -> Result<Node, Error> {
        if axis >= a.shape().len() {
            return Err(Error::IndexOutOfRange {
                index: vec![axis],
                shape: a.shape().to_vec(),
            });
        }
        Ok(Node::new(Op::Normalize { axis }, a.shape().to_vec(), vec![a.clone()]))
    }

    /// Broadcasting add of `operand` onto `target`. Evaluation is not
    /// implemented.
    pub fn broadcast_add(target: &Node, operand: &Node) -> Node {
        Node::new(
            Op::BroadcastAdd,
            target.shape().to_vec(),
            vec![target.clone(), operand.clone()],
        )
    }

    /// Convolution of `input` with `kernel`. Evaluation is not implemented.
    pub fn convolution(input: &Node, kernel: &Node, stride: usize) -> Node {
        Node::new(
            Op::Convolution { stride },
            input.shape().to_vec(),
            vec![input.clone(), kernel.clone()],
        )
    }

    /// Declared output shape.
    pub fn shape(&self) -> &[usize] {
        &self.0.shape
    }

    /// Input nodes, in positional order.
    pub fn inputs(&self) -> &[Node] {
        &self.0.inputs
    }

    pub fn op(&self) -> &Op {
        &self.0.op
    }

    pub fn name(&self) -> Option<String> {
        self.0.name.borrow().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.0.name.borrow_mut() = Some(name.into());
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.0.op, Op::Variable(_))
    }

    /// Borrow a variable's value; `None` for every other kind of node.
    pub fn value(&self) -> Option<Ref<'_, Tensor>> {
        match &self.0.op {
            Op::Variable(value) => Some(value.borrow()),
            _ => None,
        }
    }

    /// Mutably borrow a variable's value, e.g. for a gradient-descent step.
    ///
    /// The borrow must be released before the node is evaluated again.
    pub fn value_mut(&self) -> Option<RefMut<'_, Tensor>> {
        match &self.0.op {
            Op::Variable(value) => Some(value.borrow_mut()),
            _ => None,
        }
    }

    /// Replace a variable's value with a tensor of the same shape.
    ///
    /// # Errors
    ///
    /// `InvalidOperation` if this is not a variable, `ShapeMismatch` if the
    /// shape differs from the declared one.
    pub fn set_value(&self, value: Tensor) -> Result<(), Error> {
        let Op::Variable(slot) = &self.0.op else {
            return Err(Error::InvalidOperation(format!(
                "set_value on a {} node",
                self.0.op.tag()
            )));
        };
        if value.shape() != self.shape() {
            return Err(Error::shape_mismatch(self.shape(), value.shape()));
        }
        *slot.borrow_mut() = value;
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("op", &self.0.op.tag())
            .field("shape", &self.0.shape)
            .field("inputs", &self.0.inputs.len())
            .field("name", &self.0.name.borrow())
            .finish()
    }
}
