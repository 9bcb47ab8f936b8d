//! Dense n-dimensional `f32` tensor.
//!
//! A `Tensor` owns a flat buffer laid out in row-major order together with its
//! shape and the strides derived from it. Tensors are plain values: binary
//! operations allocate a new tensor, the `*_inplace` forms mutate the receiver.

use crate::error::Error;
use crate::strides::{cartesian_to_linear, compute_strides};

/// A dense, row-major tensor of `f32` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use cgraph::Tensor;
    ///
    /// let t = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self::full(shape, 0.0)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// Create a tensor with every element set to `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![value; len],
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Create a rank-0 tensor holding a single value.
    pub fn scalar(value: f32) -> Self {
        Self::full(&[], value)
    }

    /// Create tensor from data and shape.
    ///
    /// Data is expected in row-major order.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use cgraph::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[0, 1]).unwrap(), 2.0);
    /// assert_eq!(t.get(&[1, 0]).unwrap(), 4.0);
    /// ```
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, Error> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        })
    }

    /// Create a tensor by evaluating `f` at every flat (row-major) index.
    pub fn from_fn<F>(shape: &[usize], mut f: F) -> Self
    where
        F: FnMut(usize) -> f32,
    {
        let len: usize = shape.iter().product();
        Self {
            data: (0..len).map(&mut f).collect(),
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Create a `rows x cols` tensor with ones where row == col.
    ///
    /// ```
    /// use cgraph::Tensor;
    ///
    /// let eye = Tensor::identity(2, 3);
    /// assert_eq!(eye.data(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    /// ```
    pub fn identity(rows: usize, cols: usize) -> Self {
        Self::from_fn(&[rows, cols], |a| if a % cols == a / cols { 1.0 } else { 0.0 })
    }

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if tensor has zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get underlying data as slice.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get underlying data as mutable slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the tensor, returning its flat buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Get element by linear index.
    #[inline]
    pub fn get_linear(&self, i: usize) -> Option<f32> {
        self.data.get(i).copied()
    }

    fn linear_index(&self, indices: &[usize]) -> Result<usize, Error> {
        let in_range = indices.len() == self.ndim()
            && indices.iter().zip(self.shape.iter()).all(|(&i, &d)| i < d);
        if !in_range {
            return Err(Error::IndexOutOfRange {
                index: indices.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(cartesian_to_linear(indices, &self.strides))
    }

    /// Get element by cartesian indices, one per dimension.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfRange` if the number of indices differs from
    /// the rank or any coordinate is past its dimension.
    pub fn get(&self, indices: &[usize]) -> Result<f32, Error> {
        let linear = self.linear_index(indices)?;
        Ok(self.data[linear])
    }

    /// Set element by cartesian indices.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Tensor::get`].
    pub fn set(&mut self, indices: &[usize], value: f32) -> Result<(), Error> {
        let linear = self.linear_index(indices)?;
        self.data[linear] = value;
        Ok(())
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Transpose a matrix, or turn a vector of length n into an `[n, 1]` column.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotImplemented` for rank 0 and rank > 2.
    pub fn transpose(&self) -> Result<Self, Error> {
        match *self.shape.as_slice() {
            [rows, cols] => Ok(Self::from_fn(&[cols, rows], |idx| {
                // out[i, j] = self[j, i]
                self.data[(idx % rows) * cols + idx / rows]
            })),
            [n] => Self::from_vec(self.data.clone(), &[n, 1]),
            [] => Err(Error::NotImplemented("transpose of a rank-0 tensor")),
            _ => Err(Error::NotImplemented("transpose of a tensor with rank > 2")),
        }
    }
}
