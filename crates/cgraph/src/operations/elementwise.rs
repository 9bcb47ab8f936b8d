//! Element-wise tensor operations.
//!
//! The free functions are the building blocks; the named methods on
//! [`Tensor`] (`tanh`, `add`, `mul_inplace`, ...) are thin wrappers over them.

use crate::error::Error;
use crate::tensor::Tensor;

/// Apply a function to each element, returning a new tensor.
///
/// # Example
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::apply;
///
/// let t = Tensor::from_vec(vec![1.0, 4.0, 9.0], &[3]).unwrap();
/// let ts = apply(&t, f32::sqrt);
/// assert_eq!(ts.data(), &[1.0, 2.0, 3.0]);
/// ```
pub fn apply<F>(tensor: &Tensor, f: F) -> Tensor
where
    F: Fn(f32) -> f32,
{
    let data = tensor.data();
    Tensor::from_fn(tensor.shape(), |i| f(data[i]))
}

/// Apply a function to each element in-place.
pub fn apply_inplace<F>(tensor: &mut Tensor, f: F)
where
    F: Fn(f32) -> f32,
{
    for x in tensor.data_mut() {
        *x = f(*x);
    }
}

/// Combine two tensors of identical shape element by element.
///
/// # Errors
///
/// Returns `Error::ShapeMismatch` if the shapes differ.
pub fn apply_binary<F>(a: &Tensor, b: &Tensor, f: F) -> Result<Tensor, Error>
where
    F: Fn(f32, f32) -> f32,
{
    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }
    let (x, y) = (a.data(), b.data());
    Ok(Tensor::from_fn(a.shape(), |i| f(x[i], y[i])))
}

/// In-place form of [`apply_binary`]: `a[i] = f(a[i], b[i])`.
pub fn apply_binary_inplace<F>(a: &mut Tensor, b: &Tensor, f: F) -> Result<(), Error>
where
    F: Fn(f32, f32) -> f32,
{
    if a.shape() != b.shape() {
        return Err(Error::shape_mismatch(a.shape(), b.shape()));
    }
    for (x, &y) in a.data_mut().iter_mut().zip(b.data()) {
        *x = f(*x, y);
    }
    Ok(())
}

/// Multiply all elements by a scalar, returning a new tensor.
///
/// # Example
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::scale;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// assert_eq!(scale(&t, 2.0).data(), &[2.0, 4.0, 6.0]);
/// ```
pub fn scale(tensor: &Tensor, alpha: f32) -> Tensor {
    apply(tensor, |x| x * alpha)
}

/// Scale tensor in-place.
pub fn scale_inplace(tensor: &mut Tensor, alpha: f32) {
    apply_inplace(tensor, |x| x * alpha);
}

/// Sign of `x`, with `sign(0) == 0`.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Logistic function `1 / (1 + e^-x)`.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Tensor {
    pub fn abs(&self) -> Tensor {
        apply(self, f32::abs)
    }

    pub fn neg(&self) -> Tensor {
        apply(self, |x| -x)
    }

    pub fn tanh(&self) -> Tensor {
        apply(self, f32::tanh)
    }

    pub fn sigmoid(&self) -> Tensor {
        apply(self, sigmoid)
    }

    /// Element-wise sign; zero maps to zero.
    pub fn sign(&self) -> Tensor {
        apply(self, sign)
    }

    /// Raise every element to `exponent`.
    pub fn pow(&self, exponent: f32) -> Tensor {
        apply(self, |x| x.powf(exponent))
    }

    pub fn add_scalar(&self, c: f32) -> Tensor {
        apply(self, |x| x + c)
    }

    pub fn mul_scalar(&self, c: f32) -> Tensor {
        scale(self, c)
    }

    /// Element-wise sum. Shapes must be identical.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, Error> {
        apply_binary(self, other, |x, y| x + y)
    }

    /// Element-wise difference. Shapes must be identical.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, Error> {
        apply_binary(self, other, |x, y| x - y)
    }

    /// Element-wise (Hadamard) product. Shapes must be identical.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, Error> {
        apply_binary(self, other, |x, y| x * y)
    }

    pub fn abs_inplace(&mut self) {
        apply_inplace(self, f32::abs);
    }

    pub fn neg_inplace(&mut self) {
        apply_inplace(self, |x| -x);
    }

    pub fn tanh_inplace(&mut self) {
        apply_inplace(self, f32::tanh);
    }

    pub fn sigmoid_inplace(&mut self) {
        apply_inplace(self, sigmoid);
    }

    pub fn sign_inplace(&mut self) {
        apply_inplace(self, sign);
    }

    pub fn pow_inplace(&mut self, exponent: f32) {
        apply_inplace(self, |x| x.powf(exponent));
    }

    pub fn add_scalar_inplace(&mut self, c: f32) {
        apply_inplace(self, |x| x + c);
    }

    pub fn mul_scalar_inplace(&mut self, c: f32) {
        scale_inplace(self, c);
    }

    pub fn add_inplace(&mut self, other: &Tensor) -> Result<(), Error> {
        apply_binary_inplace(self, other, |x, y| x + y)
    }

    pub fn sub_inplace(&mut self, other: &Tensor) -> Result<(), Error> {
        apply_binary_inplace(self, other, |x, y| x - y)
    }

    pub fn mul_inplace(&mut self, other: &Tensor) -> Result<(), Error> {
        apply_binary_inplace(self, other, |x, y| x * y)
    }
}
