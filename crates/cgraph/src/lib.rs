//! cgraph - a small reverse-mode automatic differentiation engine.
//!
//! The crate has two layers:
//!
//! * [`Tensor`]: a dense, row-major `f32` array with element-wise math,
//!   contraction, slicing and a text round-trip format.
//! * [`autodiff`]: nodes describing tensor operations, a [`Graph`] that
//!   orders them, and memoised forward / reverse evaluation.
//!
//! # Example
//!
//! ```
//! use cgraph::Tensor;
//!
//! let a = Tensor::ones(&[3, 5]);
//! let b = Tensor::from_fn(&[5, 3], |i| (i + 1) as f32);
//! let c = a.mmul(&b).unwrap();
//! assert_eq!(c.shape(), &[3, 3]);
//! assert_eq!(&c.data()[..3], &[35.0, 40.0, 45.0]);
//! ```
//!
//! # Features
//!
//! * `gemm` (default): contraction uses faer's matrix multiply instead of a
//!   naive loop.

pub mod autodiff;
pub mod error;
pub mod operations;
mod random;
pub mod strides;
pub mod tensor;
mod text;

pub use autodiff::{Activations, Feed, Gradients, Graph, Node, NodeId, NodeValues, Op};
pub use error::Error;
pub use tensor::Tensor;
