use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::tensor::{Numeric, RcTensor};
use crate::{Error, Result};

/// A named, fixed-shape learnable matrix.
///
/// The values only change through [`Parameter::update`]; the shape never does.
#[derive(Debug, Clone)]
pub struct Parameter<T: Numeric> {
    name: String,
    tensor: RcTensor<T>,
}

impl<T: Numeric> Parameter<T> {
    /// Glorot-uniform initialisation: `U(-l, l)` with `l = sqrt(6 / (rows + cols))`.
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Parameter<T> {
        let limit = if rows + cols == 0 {
            0.0
        } else {
            (6.0 / (rows + cols) as f64).sqrt()
        };
        let uniform = Uniform::new_inclusive(-limit, limit);
        let array = (0..rows * cols)
            .map(|_| T::from_f64(uniform.sample(rng)))
            .collect();
        Parameter {
            name: name.into(),
            tensor: RcTensor::new(array, vec![rows, cols]),
        }
    }

    pub fn from_tensor(name: impl Into<String>, tensor: RcTensor<T>) -> Result<Parameter<T>> {
        tensor.matrix_dims("parameter")?;
        if tensor.requires_grad() {
            return Err(Error::InvalidData(
                "a parameter must be a leaf tensor".to_string(),
            ));
        }
        Ok(Parameter {
            name: name.into(),
            tensor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tensor(&self) -> &RcTensor<T> {
        &self.tensor
    }

    pub fn shape(&self) -> &Vec<usize> {
        self.tensor.shape()
    }

    /// `self <- self + multiplier * direction`.
    pub fn update(&mut self, direction: &RcTensor<T>, multiplier: T) -> Result<()> {
        self.tensor.update(direction, multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_glorot_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let param: Parameter<f64> = Parameter::new("w", 784, 100, &mut rng);
        let limit = (6.0_f64 / 884.0).sqrt();
        assert_eq!(param.shape(), &vec![784, 100]);
        assert!(param.tensor().as_slice().iter().all(|v| v.abs() <= limit));
        assert!(param.tensor().as_slice().iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_update() {
        let mut param = Parameter::from_tensor("b", RcTensor::from([[1.0, 1.0]])).unwrap();
        param.update(&RcTensor::from([[2.0, -2.0]]), -0.5).unwrap();
        assert_eq!(param.tensor(), &RcTensor::from([[0.0, 2.0]]));
        assert_eq!(param.name(), "b");
    }

    #[test]
    fn test_from_tensor_requires_matrix() {
        assert!(Parameter::from_tensor("s", RcTensor::scalar(1.0)).is_err());
    }
}
