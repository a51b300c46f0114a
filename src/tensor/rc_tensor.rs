use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use super::autograd::Derivative;
use super::numeric::*;
use super::raw_tensor::*;
use super::types::VjpFn;
use crate::{Error, Result};

/// A cheaply clonable handle to a [`RawTensor`].
///
/// Clones share storage and graph position, so a parameter handed to several
/// ops is the same node in the autodiff graph.
#[derive(Debug, PartialEq, Clone)]
pub struct RcTensor<T: Numeric>(pub(super) Rc<RawTensor<T>>);

impl<T> Deref for RcTensor<T>
where
    T: Numeric,
{
    type Target = RawTensor<T>;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl<T: Numeric> RcTensor<T> {
    pub(in crate::tensor) fn from_raw(raw_tensor: RawTensor<T>) -> RcTensor<T> {
        RcTensor(Rc::new(raw_tensor))
    }

    /// Builds the result of an op, recording how to push gradients back to `inputs`.
    pub(in crate::tensor) fn from_op(
        array: Vec<T>,
        shape: Vec<usize>,
        inputs: Vec<RcTensor<T>>,
        vjp: VjpFn<T>,
        debug_info: &'static str,
    ) -> RcTensor<T> {
        let mut raw_tensor = RawTensor::new(array, shape);
        raw_tensor.grad_fn = Some(Derivative::new(inputs, vjp, debug_info));
        RcTensor::from_raw(raw_tensor)
    }

    /// Identity of the graph node, shared by all clones of this handle.
    pub(in crate::tensor) fn id(&self) -> *const RawTensor<T> {
        Rc::as_ptr(&self.0)
    }

    pub fn new(array: Vec<T>, shape: Vec<usize>) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::new(array, shape))
    }

    pub fn try_new(array: Vec<T>, shape: Vec<usize>) -> Result<RcTensor<T>> {
        RawTensor::try_new(array, shape).map(RcTensor::from_raw)
    }

    pub fn new_with_filler(shape: Vec<usize>, filler: T) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::new_with_filler(shape, filler))
    }

    pub fn zeros(shape: Vec<usize>) -> RcTensor<T> {
        RcTensor::new_with_filler(shape, T::zero())
    }

    pub fn scalar(scalar: T) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::scalar(scalar))
    }

    /// The single value of a one-element tensor.
    pub fn as_scalar(&self) -> Result<T> {
        match self.array[..] {
            [value] => Ok(value),
            _ => Err(Error::NotScalar {
                shape: self.shape.clone(),
            }),
        }
    }

    /// A copy of the values with no graph attached.
    pub fn detach(&self) -> RcTensor<T> {
        RcTensor::new(self.array.clone(), self.shape.clone())
    }

    /// In-place additive update: `self <- self + multiplier * direction`.
    ///
    /// The storage is only copied when some live graph still holds this tensor.
    /// The result is always a leaf.
    pub fn update(&mut self, direction: &RcTensor<T>, multiplier: T) -> Result<()> {
        if self.shape != direction.shape {
            return Err(Error::ShapeMismatch {
                op: "update",
                left: self.shape.clone(),
                right: direction.shape.clone(),
            });
        }
        let raw_tensor = Rc::make_mut(&mut self.0);
        raw_tensor.grad_fn = None;
        for (value, &step) in raw_tensor.array.iter_mut().zip(direction.array.iter()) {
            *value += multiplier * step;
        }
        Ok(())
    }
}

impl<T: Numeric> fmt::Display for RcTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools;
        match self.shape[..] {
            [_, cols] if cols > 0 => {
                let rows = self
                    .array
                    .chunks(cols)
                    .map(|row| format!("[{}]", row.iter().join(", ")))
                    .join(",\n ");
                write!(f, "[{rows}]")
            }
            _ => write!(f, "[{}]", self.array.iter().join(", ")),
        }
    }
}

impl<T> From<T> for RcTensor<T>
where
    T: Numeric,
{
    fn from(value: T) -> Self {
        RcTensor::from_raw(RawTensor::from(value))
    }
}

impl<T, const N: usize> From<[T; N]> for RcTensor<T>
where
    T: Numeric,
{
    fn from(value: [T; N]) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::from(value))
    }
}

impl<T, const N: usize, const M: usize> From<[[T; M]; N]> for RcTensor<T>
where
    T: Numeric,
{
    fn from(value: [[T; M]; N]) -> RcTensor<T> {
        RcTensor::from_raw(RawTensor::from(value))
    }
}
