use crate::tensor::numeric::*;
use crate::tensor::utils::{dot, matmul, matmul_transpose_a, matmul_transpose_b};
use crate::tensor::{RcTensor, TensorList};
use crate::{Error, Result};

/// Row-wise dot product of `features [b, d]` with a single weight row `[1, d]`,
/// giving one score per row: `[b, 1]`.
pub fn dot_product<T: Numeric>(
    features: &RcTensor<T>,
    weights: &RcTensor<T>,
) -> Result<RcTensor<T>> {
    let (rows, cols) = features.matrix_dims("dot_product")?;
    let (weight_rows, weight_cols) = weights.matrix_dims("dot_product")?;
    if weight_rows != 1 || weight_cols != cols {
        return Err(Error::ShapeMismatch {
            op: "dot_product",
            left: features.shape().clone(),
            right: weights.shape().clone(),
        });
    }
    let w = weights.as_slice();
    let array = (0..rows).map(|r| dot(features.row(r), w)).collect();
    Ok(RcTensor::from_op(
        array,
        vec![rows, 1],
        vec![features.clone(), weights.clone()],
        dot_product_vjp,
        "dot_product",
    ))
}

fn dot_product_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let (features, weights) = (&inputs[0], &inputs[1]);
    let cols = weights.count();
    let g = upstream.as_slice();
    let w = weights.as_slice();

    let mut features_grad = Vec::with_capacity(features.count());
    let mut weights_grad = vec![T::zero(); cols];
    for (r, &g_r) in g.iter().enumerate() {
        features_grad.extend(w.iter().map(|&w_c| g_r * w_c));
        for (acc, &x) in weights_grad.iter_mut().zip(features.row(r)) {
            *acc += g_r * x;
        }
    }
    vec![
        RcTensor::new(features_grad, features.shape().clone()),
        RcTensor::new(weights_grad, weights.shape().clone()),
    ]
}

/// Matrix product `features [b, i] @ weights [i, o] -> [b, o]`.
pub fn linear<T: Numeric>(features: &RcTensor<T>, weights: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (rows, inner) = features.matrix_dims("linear")?;
    let (weight_rows, cols) = weights.matrix_dims("linear")?;
    if inner != weight_rows {
        return Err(Error::ShapeMismatch {
            op: "linear",
            left: features.shape().clone(),
            right: weights.shape().clone(),
        });
    }
    let array = matmul(features.as_slice(), weights.as_slice(), rows, inner, cols);
    Ok(RcTensor::from_op(
        array,
        vec![rows, cols],
        vec![features.clone(), weights.clone()],
        linear_vjp,
        "linear",
    ))
}

fn linear_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let (features, weights) = (&inputs[0], &inputs[1]);
    let (rows, inner) = (features.shape()[0], features.shape()[1]);
    let cols = weights.shape()[1];
    let g = upstream.as_slice();
    // d/dx = g @ w^T, d/dw = x^T @ g
    let features_grad = matmul_transpose_b(g, weights.as_slice(), rows, cols, inner);
    let weights_grad = matmul_transpose_a(features.as_slice(), g, rows, inner, cols);
    vec![
        RcTensor::new(features_grad, features.shape().clone()),
        RcTensor::new(weights_grad, weights.shape().clone()),
    ]
}

/// Adds the bias row `[1, o]` to every row of `features [b, o]`.
pub fn add_bias<T: Numeric>(features: &RcTensor<T>, bias: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (rows, cols) = features.matrix_dims("add_bias")?;
    let (bias_rows, bias_cols) = bias.matrix_dims("add_bias")?;
    if bias_rows != 1 || bias_cols != cols {
        return Err(Error::ShapeMismatch {
            op: "add_bias",
            left: features.shape().clone(),
            right: bias.shape().clone(),
        });
    }
    let b = bias.as_slice();
    let array = (0..rows)
        .flat_map(move |r| {
            features
                .row(r)
                .iter()
                .zip(b.iter())
                .map(|(&x, &shift)| x + shift)
        })
        .collect();
    Ok(RcTensor::from_op(
        array,
        vec![rows, cols],
        vec![features.clone(), bias.clone()],
        add_bias_vjp,
        "add_bias",
    ))
}

fn add_bias_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let bias = &inputs[1];
    let cols = bias.count();
    let mut bias_grad = vec![T::zero(); cols];
    if cols > 0 {
        for row in upstream.as_slice().chunks(cols) {
            for (acc, &g) in bias_grad.iter_mut().zip(row.iter()) {
                *acc += g;
            }
        }
    }
    vec![
        upstream.detach(),
        RcTensor::new(bias_grad, bias.shape().clone()),
    ]
}
