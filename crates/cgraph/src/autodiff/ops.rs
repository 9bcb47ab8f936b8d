//! Forward and adjoint rules for every [`Op`].
//!
//! Both rules receive the forward activations of the node's inputs in
//! positional order. The adjoint rule returns one contribution per input,
//! aligned with those positions.

use crate::error::Error;
use crate::operations::{
    apply_binary, concat_last, contract, contract_adjoints, min_max_normalize, norm, scale, sign,
    split_last,
};
use crate::tensor::Tensor;

use super::node::Op;

impl Op {
    /// Stable name of the operation kind.
    pub fn tag(&self) -> &'static str {
        match self {
            Op::Input => "input",
            Op::Variable(_) => "variable",
            Op::Add => "add",
            Op::AddN => "add_n",
            Op::Subtract => "subtract",
            Op::ConstantAdd(_) => "constant_add",
            Op::ConstantMultiply(_) => "constant_multiply",
            Op::ElementMultiply => "element_multiply",
            Op::MatrixMultiply => "matrix_multiply",
            Op::Tanh => "tanh",
            Op::Sigmoid => "sigmoid",
            Op::Power(_) => "power",
            Op::Abs => "abs",
            Op::HStack => "hstack",
            Op::GradientClip => "gradient_clip",
            Op::Normalize { .. } => "normalize",
            Op::BroadcastAdd => "broadcast_add",
            Op::Convolution { .. } => "convolution",
        }
    }

    /// Compute this node's value from its inputs' values.
    pub(crate) fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, Error> {
        match (self, inputs) {
            (Op::Input, _) => Err(Error::InvalidOperation(
                "input nodes are only resolved through the feed".into(),
            )),
            (Op::Variable(value), _) => value.try_borrow().map(|v| v.clone()).map_err(|_| {
                Error::InvalidOperation("variable value is mutably borrowed".into())
            }),
            (Op::Add, [a, b]) => a.add(b),
            (Op::AddN, [first, rest @ ..]) => {
                let mut sum = (*first).clone();
                for t in rest {
                    sum.add_inplace(t)?;
                }
                Ok(sum)
            }
            (Op::Subtract, [a, b]) => a.sub(b),
            (Op::ConstantAdd(c), [a]) => Ok(a.add_scalar(*c)),
            (Op::ConstantMultiply(c), [a]) => Ok(a.mul_scalar(*c)),
            (Op::ElementMultiply, [a, b]) => a.mul(b),
            (Op::MatrixMultiply, [a, b]) => contract(a, b),
            (Op::Tanh, [a]) => Ok(a.tanh()),
            (Op::Sigmoid, [a]) => Ok(a.sigmoid()),
            (Op::Power(e), [a]) => Ok(a.pow(*e)),
            (Op::Abs, [a]) => Ok(a.abs()),
            (Op::HStack, [a, b]) => concat_last(a, b),
            (Op::GradientClip, [a]) => Ok((*a).clone()),
            (Op::Normalize { axis }, [a]) => min_max_normalize(a, *axis),
            (Op::BroadcastAdd, _) => Err(Error::NotImplemented("broadcast_add forward")),
            (Op::Convolution { .. }, _) => Err(Error::NotImplemented("convolution forward")),
            (op, _) => Err(arity_error(op, inputs.len())),
        }
    }

    /// Adjoint contribution for each input given the output adjoint `adj`.
    pub(crate) fn adjoint(&self, inputs: &[&Tensor], adj: &Tensor) -> Result<Vec<Tensor>, Error> {
        match (self, inputs) {
            (Op::Input | Op::Variable(_), _) => Ok(Vec::new()),
            (Op::Add, [_, _]) => Ok(vec![adj.clone(), adj.clone()]),
            (Op::AddN, _) if !inputs.is_empty() => Ok(vec![adj.clone(); inputs.len()]),
            (Op::Subtract, [_, _]) => Ok(vec![adj.clone(), adj.neg()]),
            (Op::ConstantAdd(_), [_]) => Ok(vec![adj.clone()]),
            (Op::ConstantMultiply(c), [_]) => Ok(vec![scale(adj, *c)]),
            (Op::ElementMultiply, [a, b]) => Ok(vec![b.mul(adj)?, a.mul(adj)?]),
            (Op::MatrixMultiply, [a, b]) => {
                let (grad_a, grad_b) = contract_adjoints(a, b, adj)?;
                Ok(vec![grad_a, grad_b])
            }
            (Op::Tanh, [a]) => {
                let t = a.tanh();
                Ok(vec![apply_binary(adj, &t, |g, t| g * (1.0 - t * t))?])
            }
            (Op::Sigmoid, [a]) => {
                let s = a.sigmoid();
                Ok(vec![apply_binary(adj, &s, |g, s| g * s * (1.0 - s))?])
            }
            (Op::Power(e), [a]) => {
                let e = *e;
                Ok(vec![apply_binary(adj, a, |g, x| g * e * x.powf(e - 1.0))?])
            }
            (Op::Abs, [a]) => Ok(vec![apply_binary(adj, a, |g, x| g * sign(x))?]),
            (Op::HStack, [a, _]) => {
                let at = a.shape().last().copied().unwrap_or(0);
                let (left, right) = split_last(adj, at)?;
                Ok(vec![left, right])
            }
            (Op::GradientClip, [_]) => {
                let magnitude = norm(adj);
                if magnitude > 1.0 {
                    Ok(vec![scale(adj, 1.0 / magnitude)])
                } else {
                    Ok(vec![adj.clone()])
                }
            }
            // Re-applies the forward transform to the adjoint; this is an
            // approximation, not the derivative of min-max normalization.
            (Op::Normalize { axis }, [_]) => Ok(vec![min_max_normalize(adj, *axis)?]),
            (Op::BroadcastAdd, _) => Err(Error::NotImplemented("broadcast_add adjoint")),
            (Op::Convolution { .. }, _) => Err(Error::NotImplemented("convolution adjoint")),
            (op, _) => Err(arity_error(op, inputs.len())),
        }
    }
}

fn arity_error(op: &Op, got: usize) -> Error {
    Error::InvalidOperation(format!("{} node evaluated with {got} inputs", op.tag()))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use approx::assert_relative_eq;

    use super::*;

    fn t(data: &[f32], shape: &[usize]) -> Tensor {
        Tensor::from_vec(data.to_vec(), shape).unwrap()
    }

    #[test]
    fn test_subtract_adjoint_negates_rhs() {
        let a = t(&[1.0, 2.0], &[2]);
        let adj = t(&[0.5, -1.0], &[2]);
        let grads = Op::Subtract.adjoint(&[&a, &a], &adj).unwrap();
        assert_eq!(grads[0], adj);
        assert_eq!(grads[1].data(), &[-0.5, 1.0]);
    }

    #[test]
    fn test_element_multiply_adjoint_swaps_operands() {
        let a = t(&[1.0, 2.0], &[2]);
        let b = t(&[3.0, 4.0], &[2]);
        let adj = Tensor::ones(&[2]);
        let grads = Op::ElementMultiply.adjoint(&[&a, &b], &adj).unwrap();
        assert_eq!(grads[0], b);
        assert_eq!(grads[1], a);
    }

    #[test]
    fn test_add_n_forward_and_adjoint() {
        let a = t(&[1.0, 2.0], &[2]);
        let b = t(&[10.0, 20.0], &[2]);
        let out = Op::AddN.forward(&[&a, &b, &a]).unwrap();
        assert_eq!(out.data(), &[12.0, 24.0]);
        let grads = Op::AddN.adjoint(&[&a, &b, &a], &Tensor::ones(&[2])).unwrap();
        assert_eq!(grads.len(), 3);
    }

    #[test]
    fn test_power_adjoint() {
        let a = t(&[2.0, 3.0], &[2]);
        let grads = Op::Power(3.0).adjoint(&[&a], &Tensor::ones(&[2])).unwrap();
        assert_relative_eq!(grads[0].data()[0], 12.0, epsilon = 1e-5);
        assert_relative_eq!(grads[0].data()[1], 27.0, epsilon = 1e-5);
    }

    #[test]
    fn test_abs_adjoint_uses_sign() {
        let a = t(&[-2.0, 0.0, 5.0], &[3]);
        let adj = t(&[1.0, 1.0, 2.0], &[3]);
        let grads = Op::Abs.adjoint(&[&a], &adj).unwrap();
        assert_eq!(grads[0].data(), &[-1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_gradient_clip() {
        let a = Tensor::zeros(&[2]);
        let small = t(&[0.3, 0.4], &[2]);
        let grads = Op::GradientClip.adjoint(&[&a], &small).unwrap();
        assert_eq!(grads[0], small);

        let big = t(&[3.0, 4.0], &[2]);
        let grads = Op::GradientClip.adjoint(&[&a], &big).unwrap();
        assert_relative_eq!(grads[0].data()[0], 0.6, epsilon = 1e-6);
        assert_relative_eq!(grads[0].data()[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_hstack_adjoint_splits() {
        let a = Tensor::zeros(&[2, 1]);
        let b = Tensor::zeros(&[2, 2]);
        let adj = Tensor::from_fn(&[2, 3], |i| i as f32);
        let grads = Op::HStack.adjoint(&[&a, &b], &adj).unwrap();
        assert_eq!(grads[0].data(), &[0.0, 3.0]);
        assert_eq!(grads[1].data(), &[1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_variable_forward_clones_value() {
        let op = Op::Variable(RefCell::new(t(&[1.0, 2.0], &[2])));
        assert_eq!(op.forward(&[]).unwrap().data(), &[1.0, 2.0]);
        assert!(op.adjoint(&[], &Tensor::ones(&[2])).unwrap().is_empty());
    }

    #[test]
    fn test_unfinished_ops() {
        let a = Tensor::ones(&[2]);
        assert!(matches!(
            Op::BroadcastAdd.forward(&[&a, &a]),
            Err(Error::NotImplemented(_))
        ));
        assert!(matches!(
            Op::Convolution { stride: 1 }.adjoint(&[&a, &a], &a),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let a = Tensor::ones(&[2]);
        assert!(matches!(Op::Tanh.forward(&[&a, &a]), Err(Error::InvalidOperation(_))));
        assert!(matches!(Op::AddN.forward(&[]), Err(Error::InvalidOperation(_))));
    }
}
