//! Batch sources for the training loops.
//!
//! A [`Dataset`] hands out one epoch at a time as an owned iterator, so a loop
//! can still borrow the dataset (for [`Validation`]) while an epoch is running.

pub mod lang_id;
pub mod mnist;
pub mod synthetic;
mod tabular;

pub use lang_id::LanguageIdDataset;
pub use tabular::{TabularDataset, TabularEpoch};

use crate::tensor::RcTensor;
use crate::{Error, Result};

/// One step's worth of examples. `y` always has one row per example.
#[derive(Debug, Clone)]
pub struct Batch<X> {
    pub x: X,
    pub y: RcTensor<f64>,
}

pub trait Dataset {
    type Input;
    type Epoch: Iterator<Item = Batch<Self::Input>>;

    /// A single pass over the training examples in batches of `batch_size`.
    /// The last batch may be smaller. Fails on a zero batch size.
    fn iterate_once(&mut self, batch_size: usize) -> Result<Self::Epoch>;
}

pub trait Validation<M> {
    /// Fraction of held-out examples `model` classifies correctly, in `[0, 1]`.
    fn validation_accuracy(&self, model: &M) -> Result<f64>;
}

pub(crate) fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::InvalidConfig("batch size must be at least 1".to_string()));
    }
    Ok(())
}
