//! Tensor operations.
//!
//! Free functions over [`Tensor`](crate::Tensor). Most of them also have a
//! method form on `Tensor` itself (`a.add(&b)`, `a.mmul(&b)`, `a.tanh()`).

mod contract;
mod elementwise;
mod norm;
mod slice;

pub use contract::{contract, contract_adjoints};
pub use elementwise::{
    apply, apply_binary, apply_binary_inplace, apply_inplace, scale, scale_inplace, sigmoid, sign,
};
pub use norm::{NORMALIZE_EPSILON, max, min, min_max_normalize, norm, norm_sqr};
pub use slice::{concat_last, set_slice, set_subtensor, slice, split_last, subtensor};

pub(crate) use contract::contract_shape;
pub(crate) use slice::concat_shape;
