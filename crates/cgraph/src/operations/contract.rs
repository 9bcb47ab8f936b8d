//! Tensor contraction over the last axis of the left operand and the first
//! axis of the right operand.
//!
//! Both operands are viewed as matrices: the left one as `m x k` (all leading
//! axes folded into rows), the right one as `k x n` (all trailing axes folded
//! into columns). With the `gemm` feature the product is delegated to faer,
//! otherwise a plain row-major triple loop is used.

#[cfg(feature = "gemm")]
use faer::linalg::matmul::matmul;
#[cfg(feature = "gemm")]
use faer::{Accum, MatMut, MatRef, Par};

use crate::error::Error;
use crate::tensor::Tensor;

/// Matrix view of a contraction: `(m, k, n)` plus the output shape.
struct ContractDims {
    m: usize,
    k: usize,
    n: usize,
    shape: Vec<usize>,
}

fn contract_dims(a: &[usize], b: &[usize]) -> Result<ContractDims, Error> {
    let (Some((&k, lead)), Some((&k_b, trail))) = (a.split_last(), b.split_first()) else {
        return Err(Error::InvalidOperation(format!(
            "cannot contract tensors of shape {a:?} and {b:?}: both operands need rank >= 1"
        )));
    };
    if k != k_b {
        return Err(Error::ShapeMismatch {
            expected: vec![k],
            actual: vec![k_b],
        });
    }
    let mut shape = lead.to_vec();
    shape.extend_from_slice(trail);
    Ok(ContractDims {
        m: lead.iter().product(),
        k,
        n: trail.iter().product(),
        shape,
    })
}

/// Output shape of [`contract`] for operands of the given shapes.
pub(crate) fn contract_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, Error> {
    contract_dims(a, b).map(|dims| dims.shape)
}

/// Contract the last axis of `a` with the first axis of `b`.
///
/// The output shape is `a.shape[..-1] ++ b.shape[1..]`; for two matrices this
/// is the ordinary matrix product.
///
/// # Errors
///
/// * `Error::ShapeMismatch` if `a.shape.last != b.shape[0]`
/// * `Error::InvalidOperation` if either operand has rank 0
///
/// # Example
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::contract;
///
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], &[2, 2]).unwrap();
/// let c = contract(&a, &b).unwrap();
/// assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
/// ```
pub fn contract(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let dims = contract_dims(a.shape(), b.shape())?;
    let data = matmul_flat(a.data(), false, b.data(), false, dims.m, dims.k, dims.n);
    Tensor::from_vec(data, &dims.shape)
}

/// Adjoints of `c = contract(a, b)` given the adjoint of `c`.
///
/// Returns `(adj · bᵗ, aᵗ · adj)` shaped like `a` and `b` respectively.
pub fn contract_adjoints(a: &Tensor, b: &Tensor, adj: &Tensor) -> Result<(Tensor, Tensor), Error> {
    let dims = contract_dims(a.shape(), b.shape())?;
    if adj.shape() != dims.shape.as_slice() {
        return Err(Error::shape_mismatch(&dims.shape, adj.shape()));
    }
    let ContractDims { m, k, n, .. } = dims;
    // (m x n) · (k x n)ᵗ -> m x k
    let grad_a = matmul_flat(adj.data(), false, b.data(), true, m, n, k);
    // (m x k)ᵗ · (m x n) -> k x n
    let grad_b = matmul_flat(a.data(), true, adj.data(), false, k, m, n);
    Ok((
        Tensor::from_vec(grad_a, a.shape())?,
        Tensor::from_vec(grad_b, b.shape())?,
    ))
}

impl Tensor {
    /// Method form of [`contract`].
    pub fn mmul(&self, other: &Tensor) -> Result<Tensor, Error> {
        contract(self, other)
    }
}

/// Row-major `op(lhs) · op(rhs)` where `op(lhs)` is `m x k` and `op(rhs)` is
/// `k x n`. A transposed operand is stored with its dimensions swapped.
fn matmul_flat(
    lhs: &[f32],
    lhs_t: bool,
    rhs: &[f32],
    rhs_t: bool,
    m: usize,
    k: usize,
    n: usize,
) -> Vec<f32> {
    if m == 0 || n == 0 || k == 0 {
        return vec![0.0; m * n];
    }
    #[cfg(feature = "gemm")]
    {
        matmul_gemm(lhs, lhs_t, rhs, rhs_t, m, k, n)
    }
    #[cfg(not(feature = "gemm"))]
    {
        matmul_naive(lhs, lhs_t, rhs, rhs_t, m, k, n)
    }
}

#[cfg(feature = "gemm")]
fn matmul_gemm(
    lhs: &[f32],
    lhs_t: bool,
    rhs: &[f32],
    rhs_t: bool,
    m: usize,
    k: usize,
    n: usize,
) -> Vec<f32> {
    let lhs_mat = if lhs_t {
        MatRef::from_row_major_slice(lhs, k, m).transpose()
    } else {
        MatRef::from_row_major_slice(lhs, m, k)
    };
    let rhs_mat = if rhs_t {
        MatRef::from_row_major_slice(rhs, n, k).transpose()
    } else {
        MatRef::from_row_major_slice(rhs, k, n)
    };

    let mut out = vec![0.0f32; m * n];
    let mut out_mat = MatMut::from_row_major_slice_mut(&mut out, m, n);
    matmul(out_mat.as_mut(), Accum::Replace, lhs_mat, rhs_mat, 1.0f32, Par::Seq);
    out
}

#[cfg(any(not(feature = "gemm"), test))]
fn matmul_naive(
    lhs: &[f32],
    lhs_t: bool,
    rhs: &[f32],
    rhs_t: bool,
    m: usize,
    k: usize,
    n: usize,
) -> Vec<f32> {
    let lhs_at = |i: usize, p: usize| if lhs_t { lhs[p * m + i] } else { lhs[i * k + p] };
    let rhs_at = |p: usize, j: usize| if rhs_t { rhs[j * k + p] } else { rhs[p * n + j] };

    let mut out = vec![0.0f32; m * n];
    for i in 0..m {
        for p in 0..k {
            let av = lhs_at(i, p);
            let row = &mut out[i * n..(i + 1) * n];
            for (j, c) in row.iter_mut().enumerate() {
                *c += av * rhs_at(p, j);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn seq(shape: &[usize]) -> Tensor {
        Tensor::from_fn(shape, |i| (i + 1) as f32)
    }

    #[test]
    fn test_contract_ones_by_sequence() {
        let a = Tensor::ones(&[3, 5]);
        let b = seq(&[5, 3]);
        let c = contract(&a, &b).unwrap();
        assert_eq!(c.shape(), &[3, 3]);
        for row in c.data().chunks(3) {
            assert_eq!(row, &[35.0, 40.0, 45.0]);
        }
    }

    #[test]
    fn test_contract_higher_rank_shape() {
        let a = Tensor::ones(&[2, 3, 4]);
        let b = Tensor::ones(&[4, 5, 6]);
        let c = contract(&a, &b).unwrap();
        assert_eq!(c.shape(), &[2, 3, 5, 6]);
        assert!(c.data().iter().all(|&x| x == 4.0));
    }

    #[test]
    fn test_contract_vector_matrix() {
        let v = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let m = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let c = contract(&v, &m).unwrap();
        assert_eq!(c.shape(), &[3]);
        assert_eq!(c.data(), &[9.0, 12.0, 15.0]);
    }

    #[test]
    fn test_contract_inner_dim_mismatch() {
        let a = Tensor::ones(&[2, 3]);
        let b = Tensor::ones(&[4, 2]);
        assert!(matches!(contract(&a, &b), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_contract_rank0_rejected() {
        let a = Tensor::scalar(2.0);
        let b = Tensor::ones(&[1]);
        assert!(matches!(contract(&a, &b), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_matmul_flat_transposes_agree_with_naive() {
        let lhs = seq(&[3, 4]);
        let rhs = seq(&[4, 2]);
        let rhs_t = rhs.transpose().unwrap();
        let lhs_t = lhs.transpose().unwrap();

        let plain = matmul_naive(lhs.data(), false, rhs.data(), false, 3, 4, 2);
        let both_t = matmul_flat(lhs_t.data(), true, rhs_t.data(), true, 3, 4, 2);
        for (x, y) in plain.iter().zip(both_t.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_contract_adjoints_match_explicit_transposes() {
        let a = seq(&[2, 3]);
        let b = seq(&[3, 4]);
        let adj = Tensor::from_fn(&[2, 4], |i| i as f32 - 3.0);
        let (ga, gb) = contract_adjoints(&a, &b, &adj).unwrap();

        let expected_a = contract(&adj, &b.transpose().unwrap()).unwrap();
        let expected_b = contract(&a.transpose().unwrap(), &adj).unwrap();
        assert_eq!(ga.shape(), a.shape());
        assert_eq!(gb.shape(), b.shape());
        for (x, y) in ga.data().iter().zip(expected_a.data()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4);
        }
        for (x, y) in gb.data().iter().zip(expected_b.data()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_contract_zero_sized() {
        let a = Tensor::zeros(&[2, 0]);
        let b = Tensor::zeros(&[0, 3]);
        let c = contract(&a, &b).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert!(c.data().iter().all(|&x| x == 0.0));
    }
}
