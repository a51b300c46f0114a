//! Differentiable ops. Every op checks operand shapes, returns a new tensor and
//! records the vector-Jacobian product needed by [`gradients`](crate::tensor::gradients).

mod element_wise_ops;
mod loss;
mod misc;

pub use element_wise_ops::{add, relu};
pub use loss::{accuracy, softmax_loss, square_loss};
pub use misc::{add_bias, dot_product, linear};

use crate::tensor::{Numeric, RcTensor};
use crate::Result;

/// The single value of a one-element tensor.
pub fn as_scalar<T: Numeric>(tensor: &RcTensor<T>) -> Result<T> {
    tensor.as_scalar()
}
