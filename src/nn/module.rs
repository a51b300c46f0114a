use crate::nn::Parameter;
use crate::tensor::{Numeric, RcTensor};
use crate::Result;

pub(crate) mod private {
    pub trait Private {}
}

pub trait Module<T: Numeric>: private::Private {
    type InputType;

    fn forward(&self, inputs: &Self::InputType) -> Result<RcTensor<T>>;

    /// Learnable parameters, in a fixed order shared with `params_mut`.
    fn params(&self) -> Vec<&Parameter<T>>;

    fn params_mut(&mut self) -> Vec<&mut Parameter<T>>;
}
