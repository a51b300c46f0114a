use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::models::{check_batch_size, check_cap, check_learning_rate, check_size, TrainReport};
use crate::nn::{Linear, Mlp, Module, Parameter};
use crate::optim::Sgd;
use crate::tensor::functional;
use crate::tensor::RcTensor;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Stop once the last batch of an epoch scores below this.
    pub loss_threshold: f64,
    pub max_epochs: Option<usize>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        RegressionConfig {
            hidden_size: 200,
            batch_size: 5,
            learning_rate: 0.01,
            loss_threshold: 0.005,
            max_epochs: None,
        }
    }
}

impl RegressionConfig {
    pub fn validate(&self) -> Result<()> {
        check_size("regression", "hidden_size", self.hidden_size)?;
        check_batch_size("regression", self.batch_size)?;
        check_learning_rate("regression", self.learning_rate)?;
        check_cap("regression", "max_epochs", self.max_epochs)
    }
}

/// `1 -> hidden -> hidden -> 1` with ReLU between layers, fit with square loss.
#[derive(Debug, Clone)]
pub struct RegressionModel {
    mlp: Mlp<f64, 3>,
}

impl RegressionModel {
    pub fn new<R: Rng + ?Sized>(config: &RegressionConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let hidden = config.hidden_size;
        let mlp = Mlp::new([
            Linear::random("regression.0", 1, hidden, Some(functional::relu), rng)?,
            Linear::random("regression.1", hidden, hidden, Some(functional::relu), rng)?,
            Linear::random("regression.2", hidden, 1, None, rng)?,
        ])?;
        Ok(RegressionModel { mlp })
    }

    /// Predictions `[batch, 1]` for inputs `[batch, 1]`.
    pub fn run(&self, x: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        self.mlp.forward(x)
    }

    pub fn get_loss(&self, x: &RcTensor<f64>, y: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        functional::square_loss(&self.run(x)?, y)
    }

    /// Runs epochs until the loss of an epoch's last batch, measured before its
    /// update, is under `config.loss_threshold`.
    pub fn train<D>(&mut self, dataset: &mut D, config: &RegressionConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = RcTensor<f64>>,
    {
        config.validate()?;
        let sgd = Sgd::new(config.learning_rate)?;
        info!(
            "training regression: batch size {}, learning rate {}",
            config.batch_size, config.learning_rate
        );
        let mut report = TrainReport::default();
        loop {
            if config.max_epochs.is_some_and(|max| report.epochs >= max) {
                warn!(
                    "regression stopped after {} epochs, last loss {:?}",
                    report.epochs, report.last_loss
                );
                return Ok(report);
            }
            let mut last_loss = None;
            for batch in dataset.iterate_once(config.batch_size)? {
                let loss = self.get_loss(&batch.x, &batch.y)?;
                let value = sgd.step(self, loss)?;
                debug!("regression batch {}: loss {value}", report.iterations);
                last_loss = Some(value);
                report.iterations += 1;
            }
            let last_loss = last_loss
                .ok_or_else(|| Error::InvalidData("regression dataset is empty".to_string()))?;
            report.epochs += 1;
            report.last_loss = Some(last_loss);
            info!("regression epoch {}: last batch loss {last_loss}", report.epochs);
            if last_loss < config.loss_threshold {
                report.converged = true;
                info!("regression converged after {} epochs", report.epochs);
                return Ok(report);
            }
        }
    }
}

impl crate::nn::module::private::Private for RegressionModel {}

impl Module<f64> for RegressionModel {
    type InputType = RcTensor<f64>;

    fn forward(&self, x: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        self.run(x)
    }

    fn params(&self) -> Vec<&Parameter<f64>> {
        self.mlp.params()
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<f64>> {
        self.mlp.params_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_six_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = RegressionModel::new(&RegressionConfig::default(), &mut rng).unwrap();
        let shapes: Vec<Vec<usize>> = model.params().iter().map(|p| p.shape().clone()).collect();
        assert_eq!(
            shapes,
            vec![
                vec![1, 200],
                vec![1, 200],
                vec![200, 200],
                vec![1, 200],
                vec![200, 1],
                vec![1, 1]
            ]
        );
    }

    #[test]
    fn test_validate() {
        let config = RegressionConfig {
            batch_size: 0,
            ..RegressionConfig::default()
        };
        assert!(config.validate().is_err());
        let config = RegressionConfig {
            learning_rate: -1.0,
            ..RegressionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = RegressionConfig::default();
        assert_eq!(config.hidden_size, 200);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.loss_threshold, 0.005);
        assert_eq!(config.max_epochs, None);
        assert!(config.validate().is_ok());
    }
}
