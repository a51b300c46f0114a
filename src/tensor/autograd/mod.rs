use std::collections::{HashMap, HashSet};
use std::fmt;

use log::trace;

use crate::tensor::numeric::*;
use crate::tensor::types::VjpFn;
use crate::tensor::{RawTensor, RcTensor, TensorList};
use crate::{Error, Result};

/// The op that produced a tensor: its inputs and how to map an upstream
/// gradient onto them.
#[derive(Clone)]
pub(in crate::tensor) struct Derivative<T: Numeric> {
    pub(in crate::tensor) inputs: TensorList<T>,
    /// signature: vjp(inputs, upstream) -> one gradient per input
    vector_jacobian_product: VjpFn<T>,
    debug_info: &'static str,
}

impl<T: Numeric> fmt::Debug for Derivative<T> {
    // Printing the inputs would print the whole graph below this node.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derivative")
            .field("op", &self.debug_info)
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

impl<T: Numeric> Derivative<T> {
    pub fn new(
        inputs: TensorList<T>,
        vector_jacobian_product: VjpFn<T>,
        debug_info: &'static str,
    ) -> Derivative<T> {
        Derivative {
            inputs,
            vector_jacobian_product,
            debug_info,
        }
    }

    fn compute_vjp(&self, upstream: &RcTensor<T>) -> TensorList<T> {
        let grads = (self.vector_jacobian_product)(&self.inputs, upstream);
        debug_assert_eq!(grads.len(), self.inputs.len(), "{}", self.debug_info);
        for (grad, input) in grads.iter().zip(self.inputs.iter()) {
            debug_assert_eq!(
                grad.shape(),
                input.shape(),
                "grad and input must have the same shape in {}",
                self.debug_info
            );
        }
        grads
    }
}

/// Nodes reachable from `root`, ordered so that every node comes before the
/// inputs it was computed from.
fn topological_order<T: Numeric>(root: &RcTensor<T>) -> TensorList<T> {
    let mut visited = HashSet::new();
    let mut post_order = Vec::new();
    let mut stack = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            post_order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        if let Some(derivative) = node.grad_fn.as_ref() {
            for input in derivative.inputs.iter() {
                if !visited.contains(&input.id()) {
                    stack.push((input.clone(), false));
                }
            }
        }
    }
    post_order.reverse();
    post_order
}

/// Gradients of the scalar `loss` with respect to each of `params`, in order.
///
/// A parameter that `loss` does not depend on gets a zero gradient.
pub fn gradients<T: Numeric>(loss: &RcTensor<T>, params: &[&RcTensor<T>]) -> Result<TensorList<T>> {
    if loss.count() != 1 {
        return Err(Error::NotScalar {
            shape: loss.shape().clone(),
        });
    }
    let order = topological_order(loss);
    let mut grads: HashMap<*const RawTensor<T>, Vec<T>> = HashMap::new();
    grads.insert(loss.id(), vec![T::one()]);

    for node in order.iter() {
        let Some(derivative) = node.grad_fn.as_ref() else {
            // leaves keep their accumulated gradient for the lookup below
            continue;
        };
        let Some(upstream) = grads.remove(&node.id()) else {
            continue;
        };
        trace!("backward through {}", derivative.debug_info);
        let upstream = RcTensor::new(upstream, node.shape().clone());
        for (input, grad) in derivative
            .inputs
            .iter()
            .zip(derivative.compute_vjp(&upstream))
        {
            let acc = grads
                .entry(input.id())
                .or_insert_with(|| vec![T::zero(); grad.count()]);
            acc.iter_mut()
                .zip(grad.as_slice().iter())
                .for_each(|(a, &g)| *a += g);
        }
    }

    Ok(params
        .iter()
        .map(|param| match grads.get(&param.id()) {
            Some(grad) => RcTensor::new(grad.clone(), param.shape().clone()),
            None => RcTensor::zeros(param.shape().clone()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::functional;

    #[test]
    fn test_gradient_of_unused_param_is_zero() {
        let x = RcTensor::from([[1.0, 2.0]]);
        let w = RcTensor::from([[3.0, 4.0]]);
        let unused = RcTensor::from([[5.0]]);
        let score = functional::dot_product(&x, &w).unwrap();
        let grads = gradients(&score, &[&w, &unused]).unwrap();
        assert_eq!(grads[0], x);
        assert_eq!(grads[1], RcTensor::from([[0.0]]));
    }

    #[test]
    fn test_shared_node_accumulates() {
        // loss = sum(x*w + x*w) -> d/dw = 2x
        let x = RcTensor::from([[1.0, -2.0]]);
        let w = RcTensor::from([[0.5, 0.25]]);
        let s = functional::dot_product(&x, &w).unwrap();
        let doubled = functional::add(&s, &s).unwrap();
        let grads = gradients(&doubled, &[&w]).unwrap();
        assert_eq!(grads[0], RcTensor::from([[2.0, -4.0]]));
    }

    #[test]
    fn test_non_scalar_loss_rejected() {
        let x = RcTensor::from([[1.0, 2.0]]);
        assert!(matches!(
            gradients(&x, &[&x]),
            Err(Error::NotScalar { .. })
        ));
    }
}
