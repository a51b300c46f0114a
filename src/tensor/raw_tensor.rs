use std::cmp::PartialEq;
use std::ops::Index;

use super::autograd::Derivative;
use super::numeric::*;
use crate::{Error, Result};

/// The core `struct` in this library: a dense, row-major block of numbers
/// together with the operation that produced it, if any.
#[derive(Debug, Clone)]
pub struct RawTensor<T>
where
    T: Numeric,
{
    pub(in crate::tensor) array: Vec<T>,
    pub(in crate::tensor) shape: Vec<usize>,
    pub(in crate::tensor) grad_fn: Option<Derivative<T>>,
}

impl<T: Numeric> PartialEq for RawTensor<T> {
    // The graph is not part of a tensor's value.
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.array == other.array
    }
}

impl<T> Default for RawTensor<T>
where
    T: Numeric,
{
    fn default() -> Self {
        RawTensor {
            array: vec![],
            shape: vec![],
            grad_fn: None,
        }
    }
}

impl<T> RawTensor<T>
where
    T: Numeric,
{
    /// Panics if `array` does not hold exactly `shape.iter().product()` elements.
    pub fn new(array: Vec<T>, shape: Vec<usize>) -> RawTensor<T> {
        assert_eq!(
            shape.iter().product::<usize>(),
            array.len(),
            "array of length {} cannot have shape {:?}",
            array.len(),
            shape
        );
        RawTensor {
            array,
            shape,
            ..Default::default()
        }
    }

    pub fn try_new(array: Vec<T>, shape: Vec<usize>) -> Result<RawTensor<T>> {
        if shape.iter().product::<usize>() != array.len() {
            return Err(Error::InvalidShape {
                op: "new",
                shape,
                expected: "a shape whose product equals the array length",
            });
        }
        Ok(RawTensor {
            array,
            shape,
            ..Default::default()
        })
    }

    /// Note! An empty shape constructs a scalar.
    pub fn new_with_filler(shape: Vec<usize>, filler: T) -> RawTensor<T> {
        let total = shape.iter().product();
        RawTensor {
            array: vec![filler; total],
            shape,
            ..Default::default()
        }
    }

    pub fn scalar(scalar: T) -> RawTensor<T> {
        RawTensor {
            array: vec![scalar],
            shape: vec![],
            ..Default::default()
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.array.len() == 1 && self.shape.is_empty()
    }

    pub fn shape(&self) -> &Vec<usize> {
        &self.shape
    }

    pub fn count(&self) -> usize {
        self.array.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.array
    }

    pub fn requires_grad(&self) -> bool {
        self.grad_fn.is_some()
    }

    /// Returns `(rows, cols)` or an error naming `op` when the tensor is not a matrix.
    pub fn matrix_dims(&self, op: &'static str) -> Result<(usize, usize)> {
        match self.shape[..] {
            [rows, cols] => Ok((rows, cols)),
            _ => Err(Error::InvalidShape {
                op,
                shape: self.shape.clone(),
                expected: "a 2 dimensional matrix",
            }),
        }
    }

    pub(in crate::tensor) fn global_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() {
            return Err(Error::InvalidShape {
                op: "index",
                shape: index.to_vec(),
                expected: "an index with one entry per dimension",
            });
        }
        let mut global_idx = 0;
        let mut multiplier = 1;
        for (&dim, &idx_dim) in self.shape.iter().zip(index.iter()).rev() {
            if idx_dim >= dim {
                return Err(Error::ShapeMismatch {
                    op: "index",
                    left: self.shape.clone(),
                    right: index.to_vec(),
                });
            }
            global_idx += idx_dim * multiplier;
            multiplier *= dim;
        }
        Ok(global_idx)
    }

    pub fn get(&self, index: &[usize]) -> Result<&T> {
        let global_idx = self.global_index(index)?;
        Ok(&self.array[global_idx])
    }

    /// Row `row` of a matrix, as a slice.
    pub fn row(&self, row: usize) -> &[T] {
        let cols = self.shape.last().copied().unwrap_or(1);
        &self.array[row * cols..(row + 1) * cols]
    }
}

impl<T> Index<&[usize]> for RawTensor<T>
where
    T: Numeric,
{
    type Output = T;

    /// Panics on an out-of-bounds index, like slice indexing.
    fn index(&self, index: &[usize]) -> &Self::Output {
        match self.get(index) {
            Ok(v) => v,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<T> From<T> for RawTensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        RawTensor::scalar(value)
    }
}

impl<T, const N: usize> From<[T; N]> for RawTensor<T>
where
    T: Numeric,
{
    /// A 1-D array becomes a row vector of shape `[1, N]`.
    fn from(value: [T; N]) -> RawTensor<T> {
        RawTensor::new(value.to_vec(), vec![1, N])
    }
}

impl<T, const N: usize, const M: usize> From<[[T; M]; N]> for RawTensor<T>
where
    T: Numeric,
{
    fn from(value: [[T; M]; N]) -> RawTensor<T> {
        let array = value.iter().flat_map(|row| row.iter().copied()).collect();
        RawTensor::new(array, vec![N, M])
    }
}
