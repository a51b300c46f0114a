use log::trace;

use crate::nn::Module;
use crate::tensor::{gradients, Numeric, RcTensor};
use crate::{Error, Result};

/// Plain gradient descent with a fixed step size: `param <- param - lr * grad`.
#[derive(Debug, Clone, Copy)]
pub struct Sgd<T: Numeric> {
    learning_rate: T,
}

impl<T: Numeric> Sgd<T> {
    pub fn new(learning_rate: T) -> Result<Self> {
        if !(learning_rate.is_finite() && learning_rate > T::zero()) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }
        Ok(Sgd { learning_rate })
    }

    /// Differentiates `loss` with respect to every parameter of `module`, then
    /// applies the update. Returns the loss value seen before the update.
    pub fn step<M: Module<T>>(&self, module: &mut M, loss: RcTensor<T>) -> Result<T> {
        let value = loss.as_scalar()?;
        let grads = {
            let params: Vec<&RcTensor<T>> =
                module.params().into_iter().map(|p| p.tensor()).collect();
            gradients(&loss, &params)?
        };
        // release the graph so the updates below happen in place
        drop(loss);
        sgd_step(module, &grads, self.learning_rate)?;
        trace!("sgd step: loss={value}");
        Ok(value)
    }
}

/// Applies `param <- param - learning_rate * grad` to each parameter of `module`,
/// pairing `grads` with `module.params_mut()` by position.
pub fn sgd_step<T: Numeric, M: Module<T>>(
    module: &mut M,
    grads: &[RcTensor<T>],
    learning_rate: T,
) -> Result<()> {
    let params = module.params_mut();
    if params.len() != grads.len() {
        return Err(Error::InvalidData(format!(
            "{} gradients for {} parameters",
            grads.len(),
            params.len()
        )));
    }
    for (param, grad) in params.into_iter().zip(grads.iter()) {
        param.update(grad, -learning_rate)?;
    }
    Ok(())
}
