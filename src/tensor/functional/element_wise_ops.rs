use crate::tensor::numeric::*;
use crate::tensor::{RcTensor, TensorList};
use crate::{Error, Result};

/// Elementwise sum of two tensors of the same shape.
pub fn add<T: Numeric>(left: &RcTensor<T>, right: &RcTensor<T>) -> Result<RcTensor<T>> {
    if left.shape() != right.shape() {
        return Err(Error::ShapeMismatch {
            op: "add",
            left: left.shape().clone(),
            right: right.shape().clone(),
        });
    }
    let array = left
        .as_slice()
        .iter()
        .zip(right.as_slice().iter())
        .map(|(&l, &r)| l + r)
        .collect();
    Ok(RcTensor::from_op(
        array,
        left.shape().clone(),
        vec![left.clone(), right.clone()],
        add_vjp,
        "add",
    ))
}

fn add_vjp<T: Numeric>(_inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    vec![upstream.detach(), upstream.detach()]
}

/// `max(x, 0)` elementwise.
pub fn relu<T: Numeric>(tensor: &RcTensor<T>) -> Result<RcTensor<T>> {
    let array = tensor
        .as_slice()
        .iter()
        .map(|&v| v.max(T::zero()))
        .collect();
    Ok(RcTensor::from_op(
        array,
        tensor.shape().clone(),
        vec![tensor.clone()],
        relu_vjp,
        "relu",
    ))
}

fn relu_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let input = &inputs[0];
    let array = input
        .as_slice()
        .iter()
        .zip(upstream.as_slice().iter())
        .map(|(&x, &g)| if x > T::zero() { g } else { T::zero() })
        .collect();
    vec![RcTensor::new(array, input.shape().clone())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        let left = RcTensor::from([[1.0, 2.0], [3.0, 4.0]]);
        let right = RcTensor::new_with_filler(vec![2, 2], 1.0);
        assert_eq!(
            add(&left, &right).unwrap(),
            RcTensor::from([[2.0, 3.0], [4.0, 5.0]])
        );
    }

    #[test]
    fn test_add_requires_equal_shapes() {
        let left = RcTensor::new_with_filler(vec![4, 4], 1.0);
        let right = RcTensor::new_with_filler(vec![1, 4], 1.0);
        assert!(matches!(
            add(&left, &right),
            Err(Error::ShapeMismatch { op: "add", .. })
        ));
    }

    #[test]
    fn test_relu() {
        let input = RcTensor::from([[-1.0, 0.0, 2.5]]);
        assert_eq!(relu(&input).unwrap(), RcTensor::from([[0.0, 0.0, 2.5]]));
    }
}
