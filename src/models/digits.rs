use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Validation};
use crate::models::{check_batch_size, check_cap, check_learning_rate, check_size, TrainReport};
use crate::nn::{Linear, Mlp, Module, Parameter};
use crate::optim::Sgd;
use crate::tensor::functional;
use crate::tensor::RcTensor;
use crate::{Error, Result};

/// Flattened 28x28 greyscale image.
pub const INPUT_SIZE: usize = 784;
pub const NUM_CLASSES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitConfig {
    pub hidden_size: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub target_accuracy: f64,
    /// Validation accuracy is only checked once this much training time has
    /// passed.
    pub eval_after_secs: u64,
    pub max_epochs: Option<usize>,
    /// Examples held out of the MNIST training file for validation.
    pub dev_len: usize,
}

impl Default for DigitConfig {
    fn default() -> Self {
        DigitConfig {
            hidden_size: 100,
            batch_size: 10,
            learning_rate: 0.008,
            target_accuracy: 0.97,
            eval_after_secs: 300,
            max_epochs: None,
            dev_len: 5000,
        }
    }
}

impl DigitConfig {
    pub fn validate(&self) -> Result<()> {
        check_size("digits", "hidden_size", self.hidden_size)?;
        check_batch_size("digits", self.batch_size)?;
        check_learning_rate("digits", self.learning_rate)?;
        check_cap("digits", "max_epochs", self.max_epochs)?;
        check_size("digits", "dev_len", self.dev_len)?;
        if !(0.0..=1.0).contains(&self.target_accuracy) {
            return Err(Error::InvalidConfig(format!(
                "digits: target accuracy must be in [0, 1], got {}",
                self.target_accuracy
            )));
        }
        Ok(())
    }
}

/// `784 -> hidden -> hidden -> 10` classifier trained with softmax loss.
#[derive(Debug, Clone)]
pub struct DigitClassificationModel {
    mlp: Mlp<f64, 3>,
}

impl DigitClassificationModel {
    pub fn new<R: Rng + ?Sized>(config: &DigitConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let hidden = config.hidden_size;
        let mlp = Mlp::new([
            Linear::random("digits.0", INPUT_SIZE, hidden, Some(functional::relu), rng)?,
            Linear::random("digits.1", hidden, hidden, Some(functional::relu), rng)?,
            Linear::random("digits.2", hidden, NUM_CLASSES, None, rng)?,
        ])?;
        Ok(DigitClassificationModel { mlp })
    }

    /// Class scores (logits) `[batch, 10]` for images `[batch, 784]`.
    pub fn run(&self, x: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        self.mlp.forward(x)
    }

    pub fn get_loss(&self, x: &RcTensor<f64>, y: &RcTensor<f64>) -> Result<RcTensor<f64>> {
        functional::softmax_loss(&self.run(x)?, y)
    }

    /// Trains epoch after epoch. After each epoch, once `eval_after_secs` have
    /// passed since the start, validation accuracy is measured and training
    /// ends when it reaches `target_accuracy`.
    pub fn train<D>(&mut self, dataset: &mut D, config: &DigitConfig) -> Result<TrainReport>
    where
        D: Dataset<Input = RcTensor<f64>> + Validation<Self>,
    {
        config.validate()?;
        let sgd = Sgd::new(config.learning_rate)?;
        let eval_after = Duration::from_secs(config.eval_after_secs);
        info!(
            "training digit classifier: batch size {}, learning rate {}, evaluating after {:?}",
            config.batch_size, config.learning_rate, eval_after
        );
        let started = Instant::now();
        let mut report = TrainReport::default();
        loop {
            if config.max_epochs.is_some_and(|max| report.epochs >= max) {
                warn!(
                    "digit classifier stopped after {} epochs, accuracy {:?}",
                    report.epochs, report.validation_accuracy
                );
                return Ok(report);
            }
            for batch in dataset.iterate_once(config.batch_size)? {
                let loss = self.get_loss(&batch.x, &batch.y)?;
                let value = sgd.step(self, loss)?;
                debug!("digits batch {}: loss {value}", report.iterations);
                report.last_loss = Some(value);
                report.iterations += 1;
            }
            report.epochs += 1;
            let elapsed = started.elapsed();
            if elapsed < eval_after {
                continue;
            }
            let accuracy = dataset.validation_accuracy(&*self)?;
            report.validation_accuracy = Some(accuracy);
            info!(
                "digits epoch {}: {:.1}s elapsed, validation accuracy {accuracy:.4}",
                report.epochs,
                elapsed.as_secs_f64()
            );
            if accuracy >= config.target_accuracy {
                report.converged = true;
                info!("digit classifier reached {accuracy:.4} after {} epochs", report.epochs);
                return Ok(report);
            }
        }
    }
}

impl crate::nn::module::private::Private for DigitClassificationModel {}

impl Module<f64> for DigitClassificationModel {
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
    fn test_scores_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let model = DigitClassificationModel::new(&DigitConfig::default(), &mut rng).unwrap();
        let images = RcTensor::new_with_filler(vec![3, INPUT_SIZE], 0.5);
        assert_eq!(model.run(&images).unwrap().shape(), &vec![3, NUM_CLASSES]);
    }

    #[test]
    fn test_rejects_wrong_image_width() {
        let mut rng = StdRng::seed_from_u64(5);
        let model = DigitClassificationModel::new(&DigitConfig::default(), &mut rng).unwrap();
        let images = RcTensor::new_with_filler(vec![2, 28], 0.5);
        assert!(matches!(model.run(&images), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_target_accuracy_range() {
        let config = DigitConfig {
            target_accuracy: 1.5,
            ..DigitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_dev_split() {
        let config = DigitConfig {
            dev_len: 0,
            ..DigitConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = DigitConfig::default();
        assert_eq!(config.hidden_size, 100);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.learning_rate, 0.008);
        assert_eq!(config.target_accuracy, 0.97);
        assert_eq!(config.eval_after_secs, 300);
        assert_eq!(config.max_epochs, None);
        assert_eq!(config.dev_len, 5000);
        assert!(config.validate().is_ok());
    }
}
