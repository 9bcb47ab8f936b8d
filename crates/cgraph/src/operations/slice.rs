//! Tensor slicing, sub-tensor selection and last-axis concatenation.

use std::ops::RangeInclusive;

use crate::error::Error;
use crate::strides::increment;
use crate::tensor::Tensor;

/// Validate inclusive ranges against `shape` and return the extent per axis.
fn slice_extents(
    shape: &[usize],
    ranges: &[RangeInclusive<usize>],
) -> Result<Vec<usize>, Error> {
    if ranges.len() != shape.len() {
        return Err(Error::IndexOutOfRange {
            index: ranges.iter().map(|r| *r.start()).collect(),
            shape: shape.to_vec(),
        });
    }
    ranges
        .iter()
        .zip(shape)
        .map(|(range, &dim)| {
            let (start, end) = (*range.start(), *range.end());
            if start > end || end >= dim {
                return Err(Error::IndexOutOfRange {
                    index: vec![start, end],
                    shape: shape.to_vec(),
                });
            }
            Ok(end - start + 1)
        })
        .collect()
}

/// Visit every position of the hyper-rectangle `ranges`, calling `f` with the
/// linear offset inside the source tensor and the running output position.
fn for_each_in_slice<F>(
    strides: &[usize],
    ranges: &[RangeInclusive<usize>],
    extents: &[usize],
    mut f: F,
) where
    F: FnMut(usize, usize),
{
    let total: usize = extents.iter().product();
    let mut indices = vec![0usize; extents.len()];
    for pos in 0..total {
        let offset: usize = indices
            .iter()
            .zip(ranges)
            .zip(strides)
            .map(|((&i, range), &stride)| (range.start() + i) * stride)
            .sum();
        f(offset, pos);
        increment(&mut indices, extents);
    }
}

/// Extract the inclusive hyper-rectangle `ranges` (one range per axis).
///
/// # Errors
///
/// Returns `Error::IndexOutOfRange` if the number of ranges differs from the
/// rank, a range is reversed, or a range end is past its dimension.
///
/// # Example
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::slice;
///
/// let t = Tensor::from_fn(&[3, 4], |i| i as f32);
/// let s = slice(&t, &[0..=1, 1..=2]).unwrap();
/// assert_eq!(s.shape(), &[2, 2]);
/// assert_eq!(s.data(), &[1.0, 2.0, 5.0, 6.0]);
/// ```
pub fn slice(tensor: &Tensor, ranges: &[RangeInclusive<usize>]) -> Result<Tensor, Error> {
    let extents = slice_extents(tensor.shape(), ranges)?;
    let src = tensor.data();
    let mut data = vec![0.0f32; extents.iter().product()];
    for_each_in_slice(tensor.strides(), ranges, &extents, |offset, pos| {
        data[pos] = src[offset];
    });
    Tensor::from_vec(data, &extents)
}

/// Write `value` into the inclusive hyper-rectangle `ranges`.
///
/// `value` is read in row-major order and must hold exactly as many elements
/// as the region.
pub fn set_slice(
    tensor: &mut Tensor,
    ranges: &[RangeInclusive<usize>],
    value: &Tensor,
) -> Result<(), Error> {
    let extents = slice_extents(tensor.shape(), ranges)?;
    if value.len() != extents.iter().product::<usize>() {
        return Err(Error::shape_mismatch(&extents, value.shape()));
    }
    let strides = tensor.strides().to_vec();
    let src = value.data();
    let dst = tensor.data_mut();
    for_each_in_slice(&strides, ranges, &extents, |offset, pos| {
        dst[offset] = src[pos];
    });
    Ok(())
}

/// `(outer, dim, inner)` block sizes around `axis`.
fn axis_blocks(shape: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = shape[..axis].iter().product();
    let inner = shape[axis + 1..].iter().product();
    (outer, shape[axis], inner)
}

fn check_axis_index(shape: &[usize], axis: usize, index: usize) -> Result<(), Error> {
    if axis >= shape.len() || index >= shape[axis] {
        return Err(Error::IndexOutOfRange {
            index: vec![axis, index],
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

/// Select position `index` along `axis`, dropping that axis.
///
/// ```
/// use cgraph::Tensor;
/// use cgraph::operations::subtensor;
///
/// let t = Tensor::from_fn(&[2, 3], |i| i as f32);
/// assert_eq!(subtensor(&t, 0, 1).unwrap().data(), &[3.0, 4.0, 5.0]);
/// assert_eq!(subtensor(&t, 1, 2).unwrap().data(), &[2.0, 5.0]);
/// ```
pub fn subtensor(tensor: &Tensor, axis: usize, index: usize) -> Result<Tensor, Error> {
    check_axis_index(tensor.shape(), axis, index)?;
    let (outer, dim, inner) = axis_blocks(tensor.shape(), axis);
    let src = tensor.data();
    let mut data = Vec::with_capacity(outer * inner);
    for o in 0..outer {
        let start = (o * dim + index) * inner;
        data.extend_from_slice(&src[start..start + inner]);
    }
    let mut shape = tensor.shape().to_vec();
    shape.remove(axis);
    Tensor::from_vec(data, &shape)
}

/// Replace position `index` along `axis` with `value`, whose shape must be
/// the tensor's shape without `axis`.
pub fn set_subtensor(
    tensor: &mut Tensor,
    axis: usize,
    index: usize,
    value: &Tensor,
) -> Result<(), Error> {
    check_axis_index(tensor.shape(), axis, index)?;
    let mut expected = tensor.shape().to_vec();
    expected.remove(axis);
    if value.shape() != expected.as_slice() {
        return Err(Error::shape_mismatch(&expected, value.shape()));
    }
    let (outer, dim, inner) = axis_blocks(tensor.shape(), axis);
    let src = value.data();
    let dst = tensor.data_mut();
    for o in 0..outer {
        let start = (o * dim + index) * inner;
        dst[start..start + inner].copy_from_slice(&src[o * inner..(o + 1) * inner]);
    }
    Ok(())
}

/// Concatenate two tensors along their last axis.
///
/// Both operands need the same rank (at least 1) and equal sizes on every
/// other axis.
pub fn concat_last(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let shape = concat_shape(a.shape(), b.shape())?;
    let (la, lb) = (a.shape()[a.ndim() - 1], b.shape()[b.ndim() - 1]);
    let rows: usize = shape[..shape.len() - 1].iter().product();
    let mut data = Vec::with_capacity(a.len() + b.len());
    for r in 0..rows {
        data.extend_from_slice(&a.data()[r * la..(r + 1) * la]);
        data.extend_from_slice(&b.data()[r * lb..(r + 1) * lb]);
    }
    Tensor::from_vec(data, &shape)
}

/// Output shape of [`concat_last`].
pub(crate) fn concat_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>, Error> {
    match (a.split_last(), b.split_last()) {
        (Some((&la, lead_a)), Some((&lb, lead_b))) if lead_a == lead_b => {
            let mut shape = lead_a.to_vec();
            shape.push(la + lb);
            Ok(shape)
        }
        _ => Err(Error::shape_mismatch(a, b)),
    }
}

/// Split a tensor along its last axis at `at`, the inverse of [`concat_last`].
pub fn split_last(tensor: &Tensor, at: usize) -> Result<(Tensor, Tensor), Error> {
    let Some((&last, lead)) = tensor.shape().split_last() else {
        return Err(Error::InvalidOperation("cannot split a rank-0 tensor".into()));
    };
    if at > last {
        return Err(Error::IndexOutOfRange {
            index: vec![at],
            shape: tensor.shape().to_vec(),
        });
    }
    let rows: usize = lead.iter().product();
    let mut left = Vec::with_capacity(rows * at);
    let mut right = Vec::with_capacity(rows * (last - at));
    for row in 0..rows {
        let chunk = &tensor.data()[row * last..(row + 1) * last];
        left.extend_from_slice(&chunk[..at]);
        right.extend_from_slice(&chunk[at..]);
    }
    let mut left_shape = lead.to_vec();
    left_shape.push(at);
    let mut right_shape = lead.to_vec();
    right_shape.push(last - at);
    Ok((
        Tensor::from_vec(left, &left_shape)?,
        Tensor::from_vec(right, &right_shape)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::single_range_in_vec_init)]
    fn test_slice_1d_inclusive() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0], &[5]).unwrap();
        let s = slice(&t, &[1..=3]).unwrap();
        assert_eq!(s.shape(), &[3]);
        assert_eq!(s.data(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_slice_3d() {
        let t = Tensor::from_fn(&[4, 5, 6], |i| i as f32);
        let s = slice(&t, &[1..=2, 2..=3, 0..=1]).unwrap();
        assert_eq!(s.shape(), &[2, 2, 2]);
        assert_eq!(s.get(&[0, 0, 0]).unwrap(), t.get(&[1, 2, 0]).unwrap());
        assert_eq!(s.get(&[1, 1, 1]).unwrap(), t.get(&[2, 3, 1]).unwrap());
    }

    #[test]
    fn test_slice_single_element() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let s = slice(&t, &[0..=0, 1..=1]).unwrap();
        assert_eq!(s.shape(), &[1, 1]);
        assert_eq!(s.data(), &[2.0]);
    }

    #[test]
    #[allow(clippy::single_range_in_vec_init)]
    fn test_slice_errors() {
        let t = Tensor::ones(&[2, 2]);
        assert!(matches!(slice(&t, &[0..=1]), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(slice(&t, &[0..=2, 0..=1]), Err(Error::IndexOutOfRange { .. })));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = slice(&t, &[1..=0, 0..=1]);
        assert!(reversed.is_err());
    }

    #[test]
    fn test_set_slice() {
        let mut t = Tensor::zeros(&[3, 3]);
        let patch = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        set_slice(&mut t, &[1..=2, 0..=1], &patch).unwrap();
        assert_eq!(t.data(), &[0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 3.0, 4.0, 0.0]);
        assert_eq!(slice(&t, &[1..=2, 0..=1]).unwrap(), patch);
    }

    #[test]
    fn test_set_slice_wrong_size() {
        let mut t = Tensor::zeros(&[3, 3]);
        let patch = Tensor::ones(&[3]);
        assert!(matches!(
            set_slice(&mut t, &[0..=1, 0..=1], &patch),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_subtensor_roundtrip() {
        let t = Tensor::from_fn(&[2, 3, 4], |i| i as f32);
        let mut u = Tensor::zeros(&[2, 3, 4]);
        for i in 0..3 {
            let sub = subtensor(&t, 1, i).unwrap();
            assert_eq!(sub.shape(), &[2, 4]);
            set_subtensor(&mut u, 1, i, &sub).unwrap();
        }
        assert_eq!(t, u);
    }

    #[test]
    fn test_subtensor_errors() {
        let mut t = Tensor::zeros(&[2, 3]);
        assert!(subtensor(&t, 2, 0).is_err());
        assert!(subtensor(&t, 0, 2).is_err());
        assert!(matches!(
            set_subtensor(&mut t, 0, 0, &Tensor::ones(&[2])),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_concat_and_split_last() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let b = Tensor::from_vec(vec![5.0, 6.0], &[2, 1]).unwrap();
        let c = concat_last(&a, &b).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.data(), &[1.0, 2.0, 5.0, 3.0, 4.0, 6.0]);

        let (l, r) = split_last(&c, 2).unwrap();
        assert_eq!(l, a);
        assert_eq!(r, b);
    }

    #[test]
    fn test_concat_shape_mismatch() {
        let a = Tensor::ones(&[2, 2]);
        let b = Tensor::ones(&[3, 2]);
        assert!(matches!(concat_last(&a, &b), Err(Error::ShapeMismatch { .. })));
        assert!(concat_last(&Tensor::scalar(1.0), &Tensor::scalar(2.0)).is_err());
    }
}
