use rand::Rng;

use crate::nn::{Linear, Module, Parameter};
use crate::tensor::functional;
use crate::tensor::{Numeric, RcTensor};
use crate::{Error, Result};

/// One recurrent step whose weights are shared by every position of a sequence:
///
/// ```text
/// h = relu(x @ input + h @ recurrent + bias)
/// h = relu(h @ transition.weights + transition.bias)
/// ```
///
/// The state before the first step is `xs[0] @ input`.
#[derive(Debug, Clone)]
pub struct RecurrentCell<T: Numeric> {
    input: Parameter<T>,
    recurrent: Parameter<T>,
    bias: Parameter<T>,
    transition: Linear<T>,
}

impl<T: Numeric> RecurrentCell<T> {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(RecurrentCell {
            input: Parameter::new("cell.input", input_size, hidden_size, rng),
            recurrent: Parameter::new("cell.recurrent", hidden_size, hidden_size, rng),
            bias: Parameter::new("cell.bias", 1, hidden_size, rng),
            transition: Linear::random(
                "cell.transition",
                hidden_size,
                hidden_size,
                Some(functional::relu),
                rng,
            )?,
        })
    }

    pub fn initial_state(&self, first: &RcTensor<T>) -> Result<RcTensor<T>> {
        functional::linear(first, self.input.tensor())
    }

    pub fn step(&self, hidden: &RcTensor<T>, x: &RcTensor<T>) -> Result<RcTensor<T>> {
        let mixed = functional::add(
            &functional::linear(x, self.input.tensor())?,
            &functional::linear(hidden, self.recurrent.tensor())?,
        )?;
        let hidden = functional::relu(&functional::add_bias(&mixed, self.bias.tensor())?)?;
        self.transition.forward(&hidden)
    }

    /// Folds the cell over `xs` in order and returns the final hidden state.
    pub fn fold(&self, xs: &[RcTensor<T>]) -> Result<RcTensor<T>> {
        let first = xs.first().ok_or(Error::EmptySequence)?;
        let state = self.initial_state(first)?;
        xs.iter().try_fold(state, |hidden, x| self.step(&hidden, x))
    }
}

impl<T: Numeric> crate::nn::module::private::Private for RecurrentCell<T> {}

impl<T: Numeric> Module<T> for RecurrentCell<T> {
    type InputType = Vec<RcTensor<T>>;

    fn forward(&self, xs: &Vec<RcTensor<T>>) -> Result<RcTensor<T>> {
        self.fold(xs)
    }

    fn params(&self) -> Vec<&Parameter<T>> {
        let mut params = vec![&self.input, &self.recurrent, &self.bias];
        params.extend(self.transition.params());
        params
    }

    fn params_mut(&mut self) -> Vec<&mut Parameter<T>> {
        let mut params = vec![&mut self.input, &mut self.recurrent, &mut self.bias];
        params.extend(self.transition.params_mut());
        params
    }
}
