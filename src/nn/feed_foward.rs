use crate::nn::{Linear, Module, Parameter};
use crate::tensor::{Numeric, RcTensor};
use crate::{Error, Result};

/// A stack of `N` [`Linear`] layers applied in order.
#[derive(Debug, Clone)]
pub struct Mlp<T, const N: usize>
where
    T: Numeric,
{
    layers: [Linear<T>; N],
}

impl<T: Numeric, const N: usize> Mlp<T, N> {
    /// Fails if consecutive layers do not chain.
    pub fn new(layers: [Linear<T>; N]) -> Result<Mlp<T, N>> {
        for pair in layers.windows(2) {
            if pair[0].output_size() != pair[1].input_size() {
                return Err(Error::ShapeMismatch {
                    op: "Mlp::new",
                    left: pair[0].weights.shape().clone(),
                    right: pair[1].weights.shape().clone(),
                });
            }
        }
        Ok(Mlp { layers })
    }
}

impl<T: Numeric, const N: usize> crate::nn::module::private::Private for Mlp<T, N> {}

impl<T: Numeric, const N: usize> Module<T> for Mlp<T, N> {
    type InputType = RcTensor<T>;

    fn forward(&self, batch: &RcTensor<T>) -> Result<RcTensor<T>> {
        self.layers
            .iter()
            .try_fold(batch.clone(), |prev, layer| layer.forward(&prev))
    }

    fn params(&self) -> Vec<&Parameter<T>> {
        self.layers
            .iter()
            .flat_map(|layer| layer.params())
            .collect()
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<T>> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.params_mut())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;
    use crate::tensor::functional;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mlp_rejects_unchained_layers() {
        let mut rng = StdRng::seed_from_u64(1);
        let res = Mlp::new([
            Linear::<f64>::random("l0", 2, 4, Some(functional::relu), &mut rng).unwrap(),
            Linear::random("l1", 3, 1, None, &mut rng).unwrap(),
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_mlp() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut mlp = Mlp::new([
            Linear::random("l0", 2, 16, Some(functional::relu), &mut rng).unwrap(),
            Linear::random("l1", 16, 2, None, &mut rng).unwrap(),
        ])
        .unwrap();
        let input = RcTensor::from([[1.0, 2.0]]);
        let expected = RcTensor::from([[-1.0, 1.0]]);
        let sgd = Sgd::new(0.05).unwrap();

        let initial = functional::square_loss(&mlp.forward(&input).unwrap(), &expected)
            .unwrap()
            .as_scalar()
            .unwrap();
        for _ in 0..200 {
            let loss = functional::square_loss(&mlp.forward(&input).unwrap(), &expected).unwrap();
            sgd.step(&mut mlp, loss).unwrap();
        }
        let res = mlp.forward(&input).unwrap();
        let loss = functional::square_loss(&res, &expected)
            .unwrap()
            .as_scalar()
            .unwrap();
        assert!(loss < 0.1 * initial, "loss={loss}, initial={initial}");
        assert_eq!(mlp.params().len(), 4);
    }
}
