//! Small neural-network models trained with plain gradient descent on a
//! reference-counted autodiff tensor.

pub mod config;
pub mod data;
mod error;
pub mod models;
pub mod nn;
pub mod optim;
pub mod tensor;

pub use error::{Error, Result};
