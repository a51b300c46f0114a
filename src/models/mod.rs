//! The four trainable models. Each one owns its parameters and exposes a
//! `train` loop driven by its own config struct.

pub mod digits;
pub mod lang_id;
pub mod perceptron;
pub mod regression;

pub use digits::{DigitClassificationModel, DigitConfig};
pub use lang_id::{LanguageIdConfig, LanguageIdModel};
pub use perceptron::{Perceptron, PerceptronConfig};
pub use regression::{RegressionConfig, RegressionModel};

use crate::{Error, Result};

/// What a training run did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrainReport {
    /// Full passes over the training set.
    pub epochs: usize,
    /// Parameter updates. For the perceptron this counts mistakes.
    pub iterations: usize,
    /// `false` when a configured cap ended the run first.
    pub converged: bool,
    pub last_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

pub(crate) fn check_batch_size(model: &str, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig(format!("{model}: batch size must be at least 1")));
    }
    Ok(())
}

pub(crate) fn check_learning_rate(model: &str, learning_rate: f64) -> Result<()> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "{model}: learning rate must be finite and > 0, got {learning_rate}"
        )));
    }
    Ok(())
}

pub(crate) fn check_cap(model: &str, name: &str, cap: Option<usize>) -> Result<()> {
    if cap == Some(0) {
        return Err(Error::InvalidConfig(format!("{model}: {name} must be at least 1 when set")));
    }
    Ok(())
}

pub(crate) fn check_size(model: &str, name: &str, size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::InvalidConfig(format!("{model}: {name} must be at least 1")));
    }
    Ok(())
}
