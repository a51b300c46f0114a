use crate::tensor::RcTensor;

// Aliases kept for readability of op signatures.
pub type TensorList<T> = Vec<RcTensor<T>>;

/// Signature of a vector-Jacobian product: `vjp(inputs, upstream) -> grads`,
/// one gradient per input, each shaped like that input.
pub type VjpFn<T> = fn(&[RcTensor<T>], &RcTensor<T>) -> TensorList<T>;
