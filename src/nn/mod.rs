mod feed_foward;
mod linear;
pub(crate) mod module;
mod parameter;
mod recurrent;

pub use feed_foward::Mlp;
pub use linear::{Activation, Linear};
pub use module::Module;
pub use parameter::Parameter;
pub use recurrent::RecurrentCell;
