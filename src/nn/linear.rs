use rand::Rng;

use crate::nn::{Module, Parameter};
use crate::tensor::functional;
use crate::tensor::{Numeric, RcTensor};
use crate::{Error, Result};

pub type Activation<T> = fn(&RcTensor<T>) -> Result<RcTensor<T>>;

/// `activation(x @ weights + bias)`.
#[derive(Clone)]
pub struct Linear<T>
where
    T: Numeric,
{
    pub weights: Parameter<T>,
    pub bias: Parameter<T>,
    activation: Activation<T>,
}

impl<T> Linear<T>
where
    T: Numeric,
{
    pub fn new(
        weights: Parameter<T>,
        bias: Parameter<T>,
        activation: Option<Activation<T>>,
    ) -> Result<Self> {
        let cols = weights.shape()[1];
        if bias.shape() != &vec![1, cols] {
            return Err(Error::ShapeMismatch {
                op: "Linear::new",
                left: weights.shape().clone(),
                right: bias.shape().clone(),
            });
        }
        Ok(Linear {
            weights,
            bias,
            activation: match activation {
                Some(f) => f,
                None => |t| Ok(t.clone()),
            },
        })
    }

    /// A randomly initialised `input_size -> output_size` layer. Parameters are
    /// named `{name}.weights` and `{name}.bias`.
    pub fn random<R: Rng + ?Sized>(
        name: &str,
        input_size: usize,
        output_size: usize,
        activation: Option<Activation<T>>,
        rng: &mut R,
    ) -> Result<Self> {
        Linear::new(
            Parameter::new(format!("{name}.weights"), input_size, output_size, rng),
            Parameter::new(format!("{name}.bias"), 1, output_size, rng),
            activation,
        )
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }
}

impl<T: Numeric> std::fmt::Debug for Linear<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("weights", &self.weights.shape())
            .field("bias", &self.bias.shape())
            .finish()
    }
}

impl<T: Numeric> crate::nn::module::private::Private for Linear<T> {}

impl<T: Numeric> Module<T> for Linear<T> {
    type InputType = RcTensor<T>;

    fn forward(&self, batch: &RcTensor<T>) -> Result<RcTensor<T>> {
        let y = functional::linear(batch, self.weights.tensor())?;
        (self.activation)(&functional::add_bias(&y, self.bias.tensor())?)
    }

    fn params(&self) -> Vec<&Parameter<T>> {
        vec![&self.weights, &self.bias]
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<T>> {
        vec![&mut self.weights, &mut self.bias]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::gradients;

    fn layer(activation: Option<Activation<f64>>) -> Linear<f64> {
        Linear::new(
            Parameter::from_tensor("w", RcTensor::from([[1.0, -2.0], [-1.1, 0.7]])).unwrap(),
            Parameter::from_tensor("b", RcTensor::new_with_filler(vec![1, 2], 1.0)).unwrap(),
            activation,
        )
        .unwrap()
    }

    #[test]
    fn test_layer_no_activation() {
        let res = layer(None).forward(&RcTensor::from([[1.0, 2.0]])).unwrap();
        // [1 - 2.2 + 1, -2 + 1.4 + 1]
        let expected = [-0.2, 0.4];
        for (v, e) in res.as_slice().iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_layer_relu() {
        let res = layer(Some(functional::relu))
            .forward(&RcTensor::from([[1.0, 2.0]]))
            .unwrap();
        assert_eq!(res.as_slice()[0], 0.0);
        assert!((res.as_slice()[1] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_layer_grads_have_param_shapes() {
        let layer = layer(None);
        let input = RcTensor::from([[1.0, 2.0], [0.5, -1.0], [0.0, 3.0]]);
        let target = RcTensor::new_with_filler(vec![3, 2], 0.0);
        let loss = functional::square_loss(&layer.forward(&input).unwrap(), &target).unwrap();
        let params: Vec<_> = layer.params().into_iter().map(|p| p.tensor()).collect();
        let grads = gradients(&loss, &params).unwrap();
        assert_eq!(grads[0].shape(), &vec![2, 2]);
        assert_eq!(grads[1].shape(), &vec![1, 2]);
    }

    #[test]
    fn test_bias_must_match_output_size() {
        let weights = Parameter::from_tensor("w", RcTensor::new_with_filler(vec![2, 3], 1.0));
        let bias = Parameter::from_tensor("b", RcTensor::new_with_filler(vec![1, 2], 1.0));
        assert!(Linear::new(weights.unwrap(), bias.unwrap(), None).is_err());
    }
}
