//! Tensor norms and reductions.

use crate::error::Error;
use crate::operations::slice::{set_subtensor, subtensor};
use crate::tensor::Tensor;

/// Offset added to the range in [`min_max_normalize`] so constant slices do
/// not divide by zero.
pub const NORMALIZE_EPSILON: f32 = 1.0e-6;

/// Compute the Frobenius norm (L2 norm over all elements).
///
/// # Example
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::norm;
///
/// let t = Tensor::from_vec(vec![3.0, 4.0], &[2]).unwrap();
/// assert!((norm(&t) - 5.0).abs() < 1e-6);
/// ```
pub fn norm(tensor: &Tensor) -> f32 {
    norm_sqr(tensor).sqrt()
}

/// Compute the squared Frobenius norm.
pub fn norm_sqr(tensor: &Tensor) -> f32 {
    tensor.data().iter().map(|x| x * x).sum()
}

/// Smallest element, `None` for an empty tensor.
pub fn min(tensor: &Tensor) -> Option<f32> {
    tensor.data().iter().copied().reduce(f32::min)
}

/// Largest element, `None` for an empty tensor.
pub fn max(tensor: &Tensor) -> Option<f32> {
    tensor.data().iter().copied().reduce(f32::max)
}

/// Rescale every slice along `axis` to `[0, 1]`.
///
/// Each slice `s` (one index along `axis`) becomes
/// `(s - min(s)) / (NORMALIZE_EPSILON + max(s) - min(s))`.
///
/// # Errors
///
/// Returns `Error::IndexOutOfRange` if `axis >= tensor.ndim()`.
pub fn min_max_normalize(tensor: &Tensor, axis: usize) -> Result<Tensor, Error> {
    if axis >= tensor.ndim() {
        return Err(Error::IndexOutOfRange {
            index: vec![axis],
            shape: tensor.shape().to_vec(),
        });
    }
    let mut output = Tensor::zeros(tensor.shape());
    for i in 0..tensor.shape()[axis] {
        let mut st = subtensor(tensor, axis, i)?;
        // Slices are non-empty unless another axis has size zero.
        let (Some(low), Some(high)) = (min(&st), max(&st)) else {
            continue;
        };
        let inv_range = 1.0 / (NORMALIZE_EPSILON + (high - low));
        st.add_scalar_inplace(-low);
        st.mul_scalar_inplace(inv_range);
        set_subtensor(&mut output, axis, i, &st)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_norm_2d() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_relative_eq!(norm(&t), 30.0f32.sqrt(), epsilon = 1e-6);
        assert_relative_eq!(norm_sqr(&t), 30.0);
    }

    #[test]
    fn test_norm_scalar() {
        assert_eq!(norm(&Tensor::scalar(0.0)), 0.0);
        assert_relative_eq!(norm(&Tensor::scalar(-5.0)), 5.0);
    }

    #[test]
    fn test_min_max() {
        let t = Tensor::from_vec(vec![3.0, -1.0, 7.0, 2.0], &[4]).unwrap();
        assert_eq!(min(&t), Some(-1.0));
        assert_eq!(max(&t), Some(7.0));
        assert_eq!(min(&Tensor::zeros(&[0])), None);
    }

    #[test]
    fn test_normalize_rows() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0], &[2, 3]).unwrap();
        let n = min_max_normalize(&t, 0).unwrap();
        for row in n.data().chunks(3) {
            assert_relative_eq!(row[0], 0.0);
            assert_relative_eq!(row[1], 0.5, epsilon = 1e-5);
            assert_relative_eq!(row[2], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_normalize_columns() {
        let t = Tensor::from_vec(vec![1.0, 5.0, 3.0, 5.0], &[2, 2]).unwrap();
        let n = min_max_normalize(&t, 1).unwrap();
        // column 0 is [1, 3], column 1 is constant
        assert_relative_eq!(n.get(&[0, 0]).unwrap(), 0.0);
        assert_relative_eq!(n.get(&[1, 0]).unwrap(), 1.0, epsilon = 1e-5);
        assert_eq!(n.get(&[0, 1]).unwrap(), 0.0);
        assert_eq!(n.get(&[1, 1]).unwrap(), 0.0);
    }

    #[test]
    fn test_normalize_bad_axis() {
        let t = Tensor::ones(&[2, 2]);
        assert!(matches!(
            min_max_normalize(&t, 2),
            Err(Error::IndexOutOfRange { .. })
        ));
    }
}
