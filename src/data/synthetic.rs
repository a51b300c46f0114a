use std::f64::consts::PI;

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::data::TabularDataset;
use crate::tensor::RcTensor;
use crate::{Error, Result};

const MIN_MARGIN: f64 = 0.05;

/// `len` linearly separable points in `dims` dimensions, labelled `+1` / `-1`.
///
/// The last coordinate of every point is a constant `1`, so a separator that
/// does not pass through the origin is still a plain weight vector. Points
/// closer than `0.05` to the hidden boundary are redrawn.
pub fn perceptron_dataset<R: Rng + ?Sized>(
    len: usize,
    dims: usize,
    rng: &mut R,
) -> Result<TabularDataset> {
    if dims < 2 {
        return Err(Error::InvalidConfig(format!(
            "perceptron data needs at least 2 dimensions, got {dims}"
        )));
    }
    let uniform = Uniform::new_inclusive(-1.0, 1.0);
    let separator = loop {
        let candidate: Vec<f64> = (0..dims).map(|_| uniform.sample(rng)).collect();
        let norm = candidate.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.1 {
            break candidate.into_iter().map(|v| v / norm).collect::<Vec<f64>>();
        }
    };

    let mut features = Vec::with_capacity(len * dims);
    let mut labels = Vec::with_capacity(len);
    while labels.len() < len {
        let mut point: Vec<f64> = (0..dims - 1).map(|_| uniform.sample(rng)).collect();
        point.push(1.0);
        let margin: f64 = point.iter().zip(separator.iter()).map(|(x, w)| x * w).sum();
        if margin.abs() < MIN_MARGIN {
            continue;
        }
        labels.push(if margin >= 0.0 { 1.0 } else { -1.0 });
        features.extend(point);
    }
    debug!(
        "perceptron data: {len} points, {} positive",
        labels.iter().filter(|&&y| y > 0.0).count()
    );
    TabularDataset::new(
        RcTensor::new(features, vec![len, dims]),
        RcTensor::new(labels, vec![len, 1]),
    )
}

/// `len` evenly spaced points on `[-2pi, 2pi]` with `sin(x)` targets.
pub fn regression_dataset(len: usize) -> Result<TabularDataset> {
    if len < 2 {
        return Err(Error::InvalidConfig(format!(
            "regression data needs at least 2 points, got {len}"
        )));
    }
    let step = 4.0 * PI / (len - 1) as f64;
    let xs: Vec<f64> = (0..len).map(|i| -2.0 * PI + step * i as f64).collect();
    let ys = xs.iter().map(|x| x.sin()).collect();
    TabularDataset::new(RcTensor::new(xs, vec![len, 1]), RcTensor::new(ys, vec![len, 1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_perceptron_points_carry_bias_coordinate() {
        let mut rng = StdRng::seed_from_u64(0);
        let dataset = perceptron_dataset(50, 3, &mut rng).unwrap();
        assert_eq!(dataset.x().shape(), &vec![50, 3]);
        assert!((0..50).all(|r| dataset.x().row(r)[2] == 1.0));
        assert!(dataset.y().as_slice().iter().all(|&y| y == 1.0 || y == -1.0));
    }

    #[test]
    fn test_regression_endpoints() {
        let dataset = regression_dataset(5).unwrap();
        let xs = dataset.x().as_slice();
        assert!((xs[0] + 2.0 * PI).abs() < 1e-12);
        assert!((xs[4] - 2.0 * PI).abs() < 1e-12);
        assert!(dataset.y().as_slice()[2].abs() < 1e-12);
    }
}
