use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::models::{check_cap, TrainReport};
use crate::nn::{Module, Parameter};
use crate::tensor::functional;
use crate::tensor::RcTensor;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronConfig {
    /// Give up after this many passes. Unset, training on non-separable data
    /// never returns.
    pub max_passes: Option<usize>,
}

impl PerceptronConfig {
    pub fn validate(&self) -> Result<()> {
        check_cap("perceptron", "max_passes", self.max_passes)
    }
}

/// A binary linear classifier with labels `+1` and `-1`.
#[derive(Debug, Clone)]
pub struct Perceptron {
    weights: Parameter<f64>,
}

impl Perceptron {
    pub fn new<R: Rng + ?Sized>(dimensions: usize, rng: &mut R) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidConfig(
                "perceptron needs at least one dimension".to_string(),
            ));
        }
        Ok(Perceptron {
            weights: Parameter::new("perceptron.weights", 1, dimensions, rng),
        })
    }

    /// Starts from the given `[1, dimensions]` weight row.
    pub fn from_weights(weights: RcTensor<f64>) -> Result<Self> {
        let weights = Parameter::from_tensor("perceptron.weights", weights)?;
        if weights.shape()[0] != 1 {
            return Err(Error::InvalidShape {
                op: "Perceptron::from_weights",
                shape: weights.shape().clone(),
                expected: "[1, dimensions]",
            });
        }
        Ok(Perceptron { weights })
    }

    pub fn weights(&self) -> &RcTensor<f64> {
        self.weights.tensor()
    }

    /// Scores for a `[batch, dimensions]` input, `[batch, 1]`.
    pub fn run(&self, x: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        functional::dot_product(x, self.weights.tensor())
    }

    /// `1` if the score of the single example `x` is non-negative, else `-1`.
    pub fn get_prediction(&self, x: &RcTensor<f64>) -> Result<i32> {
        let score = self.run(x)?;
        if score.count() != 1 {
            return Err(Error::InvalidShape {
                op: "get_prediction",
                shape: x.shape().clone(),
                expected: "a single example [1, dimensions]",
            });
        }
        Ok(if score.as_scalar()? >= 0.0 { 1 } else { -1 })
    }

    /// Moves the weights by `label * x` if `x` is misclassified. Returns whether
    /// the weights changed.
    pub fn update_on(&mut self, x: &RcTensor<f64>, label: f64) -> Result<bool> {
        if label != 1.0 && label != -1.0 {
            return Err(Error::InvalidData(format!(
                "perceptron labels must be 1 or -1, got {label}"
            )));
        }
        if self.get_prediction(x)? as f64 == label {
            return Ok(false);
        }
        self.weights.update(x, label)?;
        Ok(true)
    }

    /// Sweeps the data one example at a time until a full pass makes no
    /// mistakes.
    pub fn train<D>(&mut self, dataset: &mut D, config: &PerceptronConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = RcTensor<f64>>,
    {
        config.validate()?;
        info!("training perceptron with {} weights", self.weights.shape()[1]);
        let mut report = TrainReport::default();
        loop {
            if config.max_passes.is_some_and(|max| report.epochs >= max) {
                warn!(
                    "perceptron stopped after {} passes without converging",
                    report.epochs
                );
                return Ok(report);
            }
            let mut mistakes = 0;
            for batch in dataset.iterate_once(1)? {
                let label = batch.y.as_scalar()?;
                if self.update_on(&batch.x, label)? {
                    mistakes += 1;
                    debug!("perceptron update on label {label}");
                }
            }
            report.epochs += 1;
            report.iterations += mistakes;
            info!("perceptron pass {}: {mistakes} mistakes", report.epochs);
            if mistakes == 0 {
                report.converged = true;
                info!("perceptron converged after {} passes", report.epochs);
                return Ok(report);
            }
        }
    }
}

impl crate::nn::module::private::Private for Perceptron {}

impl Module<f64> for Perceptron {
    type InputType = RcTensor<f64>;

    fn forward(&self, x: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        self.run(x)
    }

    fn params(&self) -> Vec<&Parameter<f64>> {
        vec![&self.weights]
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<f64>> {
        vec![&mut self.weights]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_predicts_positive() {
        let perceptron = Perceptron::from_weights(RcTensor::from([[1.0, -1.0]])).unwrap();
        assert_eq!(perceptron.get_prediction(&RcTensor::from([[2.0, 2.0]])).unwrap(), 1);
        assert_eq!(perceptron.get_prediction(&RcTensor::from([[0.0, 2.0]])).unwrap(), -1);
    }

    #[test]
    fn test_prediction_needs_single_example() {
        let perceptron = Perceptron::from_weights(RcTensor::from([[1.0, 1.0]])).unwrap();
        let batch = RcTensor::from([[1.0, 0.0], [0.0, 1.0]]);
        assert!(perceptron.get_prediction(&batch).is_err());
        assert_eq!(perceptron.run(&batch).unwrap().shape(), &vec![2, 1]);
    }

    #[test]
    fn test_update_adds_label_times_x() {
        let mut perceptron = Perceptron::from_weights(RcTensor::from([[1.0, 0.0]])).unwrap();
        let x = RcTensor::from([[-1.0, 2.0]]);
        assert!(perceptron.update_on(&x, 1.0).unwrap());
        assert_eq!(perceptron.weights(), &RcTensor::from([[0.0, 2.0]]));
        assert!(!perceptron.update_on(&x, 1.0).unwrap());
    }

    #[test]
    fn test_rejects_non_sign_label() {
        let mut perceptron = Perceptron::from_weights(RcTensor::from([[1.0]])).unwrap();
        assert!(perceptron.update_on(&RcTensor::from([[1.0]]), 0.5).is_err());
    }

    #[test]
    fn test_default_config_has_no_cap() {
        let config = PerceptronConfig::default();
        assert_eq!(config.max_passes, None);
        assert!(config.validate().is_ok());
        assert!(PerceptronConfig { max_passes: Some(0) }.validate().is_err());
    }
}
