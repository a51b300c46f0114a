use itertools::izip;

use crate::tensor::numeric::*;
use crate::tensor::{RcTensor, TensorList};
use crate::{Error, Result};

/// `mean((a - b)^2) / 2` over every element, as a scalar.
pub fn square_loss<T: Numeric>(
    predicted: &RcTensor<T>,
    target: &RcTensor<T>,
) -> Result<RcTensor<T>> {
    if predicted.shape() != target.shape() {
        return Err(Error::ShapeMismatch {
            op: "square_loss",
            left: predicted.shape().clone(),
            right: target.shape().clone(),
        });
    }
    let n = T::from_usize(predicted.count().max(1));
    let total = predicted
        .as_slice()
        .iter()
        .zip(target.as_slice().iter())
        .fold(T::zero(), |acc, (&p, &t)| acc + (p - t) * (p - t));
    let two = T::one() + T::one();
    Ok(RcTensor::from_op(
        vec![total / (two * n)],
        vec![],
        vec![predicted.clone(), target.clone()],
        square_loss_vjp,
        "square_loss",
    ))
}

fn square_loss_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let (predicted, target) = (&inputs[0], &inputs[1]);
    let scale = upstream.as_slice()[0] / T::from_usize(predicted.count().max(1));
    let predicted_grad: Vec<T> = predicted
        .as_slice()
        .iter()
        .zip(target.as_slice().iter())
        .map(|(&p, &t)| scale * (p - t))
        .collect();
    let target_grad = predicted_grad.iter().map(|&g| -g).collect();
    vec![
        RcTensor::new(predicted_grad, predicted.shape().clone()),
        RcTensor::new(target_grad, target.shape().clone()),
    ]
}

/// Log-softmax of each row of a `[rows, cols]` slice.
fn log_softmax_rows<T: Numeric>(logits: &[T], cols: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(logits.len());
    for row in logits.chunks(cols) {
        let max = row.iter().fold(T::neg_infinity(), |m, &v| m.max(v));
        let log_sum = row
            .iter()
            .fold(T::zero(), |acc, &v| acc + (v - max).exp())
            .ln();
        out.extend(row.iter().map(|&v| v - max - log_sum));
    }
    out
}

/// Softmax cross-entropy between `logits [b, c]` and label distributions
/// (usually one-hot rows) of the same shape, averaged over rows.
pub fn softmax_loss<T: Numeric>(logits: &RcTensor<T>, labels: &RcTensor<T>) -> Result<RcTensor<T>> {
    let (rows, cols) = logits.matrix_dims("softmax_loss")?;
    if logits.shape() != labels.shape() {
        return Err(Error::ShapeMismatch {
            op: "softmax_loss",
            left: logits.shape().clone(),
            right: labels.shape().clone(),
        });
    }
    if cols == 0 || rows == 0 {
        return Err(Error::InvalidShape {
            op: "softmax_loss",
            shape: logits.shape().clone(),
            expected: "at least one row and one class",
        });
    }
    if labels.as_slice().iter().any(|&y| y < T::zero()) {
        return Err(Error::InvalidData(
            "softmax_loss labels must be non-negative".to_string(),
        ));
    }
    let log_probs = log_softmax_rows(logits.as_slice(), cols);
    let total = log_probs
        .iter()
        .zip(labels.as_slice().iter())
        .fold(T::zero(), |acc, (&lp, &y)| acc + y * lp);
    Ok(RcTensor::from_op(
        vec![-total / T::from_usize(rows)],
        vec![],
        vec![logits.clone(), labels.clone()],
        softmax_loss_vjp,
        "softmax_loss",
    ))
}

fn softmax_loss_vjp<T: Numeric>(inputs: &[RcTensor<T>], upstream: &RcTensor<T>) -> TensorList<T> {
    let (logits, labels) = (&inputs[0], &inputs[1]);
    let (rows, cols) = (logits.shape()[0], logits.shape()[1]);
    let scale = upstream.as_slice()[0] / T::from_usize(rows);
    let log_probs = log_softmax_rows(logits.as_slice(), cols);

    let mut logits_grad = Vec::with_capacity(logits.count());
    for (lp_row, y_row) in log_probs.chunks(cols).zip(labels.as_slice().chunks(cols)) {
        let mass = y_row.iter().fold(T::zero(), |acc, &y| acc + y);
        for (&lp, &y) in lp_row.iter().zip(y_row.iter()) {
            logits_grad.push(scale * (lp.exp() * mass - y));
        }
    }
    let labels_grad = log_probs.iter().map(|&lp| -scale * lp).collect();
    vec![
        RcTensor::new(logits_grad, logits.shape().clone()),
        RcTensor::new(labels_grad, labels.shape().clone()),
    ]
}

/// Fraction of rows whose highest score matches the highest label entry.
pub fn accuracy<T: Numeric>(scores: &RcTensor<T>, labels: &RcTensor<T>) -> Result<f64> {
    let (rows, cols) = scores.matrix_dims("accuracy")?;
    if scores.shape() != labels.shape() {
        return Err(Error::ShapeMismatch {
            op: "accuracy",
            left: scores.shape().clone(),
            right: labels.shape().clone(),
        });
    }
    if rows == 0 || cols == 0 {
        return Ok(0.0);
    }
    let correct = izip!(
        scores.as_slice().chunks(cols),
        labels.as_slice().chunks(cols)
    )
    .filter(|(s, y)| crate::tensor::argmax(s) == crate::tensor::argmax(y))
    .count();
    Ok(correct as f64 / rows as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_loss_value() {
        let predicted = RcTensor::from([[1.0], [3.0]]);
        let target = RcTensor::from([[0.0], [1.0]]);
        // (1 + 4) / 2 / 2
        let loss = square_loss(&predicted, &target).unwrap();
        assert!((loss.as_scalar().unwrap() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_loss_uniform_logits() {
        let logits = RcTensor::from([[0.0, 0.0, 0.0, 0.0]]);
        let labels = RcTensor::from([[0.0, 1.0, 0.0, 0.0]]);
        let loss = softmax_loss(&logits, &labels).unwrap();
        assert!((loss.as_scalar().unwrap() - 4.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_loss_is_stable_for_large_logits() {
        let logits = RcTensor::from([[1000.0, 0.0]]);
        let labels = RcTensor::from([[1.0, 0.0]]);
        let loss = softmax_loss(&logits, &labels).unwrap().as_scalar().unwrap();
        assert!(loss.is_finite());
        assert!(loss < 1e-9);
    }

    #[test]
    fn test_accuracy() {
        let scores = RcTensor::from([[0.9, 0.1], [0.2, 0.8], [0.6, 0.4]]);
        let labels = RcTensor::from([[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        let acc = accuracy(&scores, &labels).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
    }
}
