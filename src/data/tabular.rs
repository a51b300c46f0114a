use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{check_batch_size, Batch, Dataset, Validation};
use crate::nn::Module;
use crate::tensor::functional;
use crate::tensor::RcTensor;
use crate::{Error, Result};

fn check_rows(op: &'static str, x: &RcTensor<f64>, y: &RcTensor<f64>) -> Result<usize> {
    let (x_rows, _) = x.matrix_dims(op)?;
    let (y_rows, _) = y.matrix_dims(op)?;
    if x_rows != y_rows {
        return Err(Error::ShapeMismatch {
            op,
            left: x.shape().clone(),
            right: y.shape().clone(),
        });
    }
    Ok(x_rows)
}

/// Row-aligned `x [n, d]` and `y [n, k]` matrices held in memory, with an
/// optional dev split for validation.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    x: RcTensor<f64>,
    y: RcTensor<f64>,
    dev: Option<(RcTensor<f64>, RcTensor<f64>)>,
    rng: Option<StdRng>,
}

impl TabularDataset {
    pub fn new(x: RcTensor<f64>, y: RcTensor<f64>) -> Result<Self> {
        let rows = check_rows("TabularDataset::new", &x, &y)?;
        debug!("tabular dataset: {rows} rows, x {:?}, y {:?}", x.shape(), y.shape());
        Ok(TabularDataset {
            x: x.detach(),
            y: y.detach(),
            dev: None,
            rng: None,
        })
    }

    pub fn with_dev(mut self, x: RcTensor<f64>, y: RcTensor<f64>) -> Result<Self> {
        check_rows("TabularDataset::with_dev", &x, &y)?;
        if x.shape()[1] != self.x.shape()[1] || y.shape()[1] != self.y.shape()[1] {
            return Err(Error::ShapeMismatch {
                op: "TabularDataset::with_dev",
                left: self.x.shape().clone(),
                right: x.shape().clone(),
            });
        }
        self.dev = Some((x.detach(), y.detach()));
        Ok(self)
    }

    /// Visit the training rows in a fresh random order every epoch.
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x(&self) -> &RcTensor<f64> {
        &self.x
    }

    pub fn y(&self) -> &RcTensor<f64> {
        &self.y
    }

    pub fn dev(&self) -> Option<&(RcTensor<f64>, RcTensor<f64>)> {
        self.dev.as_ref()
    }
}

impl Dataset for TabularDataset {
    type Input = RcTensor<f64>;
    type Epoch = TabularEpoch;

    fn iterate_once(&mut self, batch_size: usize) -> Result<TabularEpoch> {
        check_batch_size(batch_size)?;
        let mut order: Vec<usize> = (0..self.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }
        Ok(TabularEpoch {
            x: self.x.clone(),
            y: self.y.clone(),
            order,
            batch_size,
            cursor: 0,
        })
    }
}

impl<M> Validation<M> for TabularDataset
where
    M: Module<f64, InputType = RcTensor<f64>>,
{
    fn validation_accuracy(&self, model: &M) -> Result<f64> {
        let (x, y) = self
            .dev
            .as_ref()
            .filter(|(x, _)| x.shape()[0] > 0)
            .ok_or_else(|| Error::InvalidData("dataset has no dev split".to_string()))?;
        let scores = model.forward(x)?;
        functional::accuracy(&scores, y)
    }
}

/// One epoch of a [`TabularDataset`]. Holds its own handles to the data.
#[derive(Debug)]
pub struct TabularEpoch {
    x: RcTensor<f64>,
    y: RcTensor<f64>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

fn gather(source: &RcTensor<f64>, rows: &[usize]) -> RcTensor<f64> {
    let cols = source.shape()[1];
    let array = rows
        .iter()
        .flat_map(|&r| source.row(r).iter().copied())
        .collect();
    RcTensor::new(array, vec![rows.len(), cols])
}

impl Iterator for TabularEpoch {
    type Item = Batch<RcTensor<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        self.cursor = end;
        Some(Batch {
            x: gather(&self.x, rows),
            y: gather(&self.y, rows),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.cursor + self.batch_size - 1) / self.batch_size;
        (left, Some(left))
    }
}
