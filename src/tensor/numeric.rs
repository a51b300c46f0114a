pub use num::Float;
use std::fmt::{Debug, Display};

pub use std::ops::{AddAssign, MulAssign, SubAssign};

pub trait Numeric:
    Float + AddAssign + SubAssign + MulAssign + Debug + Display + Default + Send + Sync + 'static
{
    fn from_usize(n: usize) -> Self;
    fn from_f64(value: f64) -> Self;
}

// https://stackoverflow.com/questions/42381185/specifying-generic-parameter-to-belong-to-a-small-set-of-types
macro_rules! numeric_impl {
    ($($t: ty),+) => {
        $(
            impl Numeric for $t {
                #[inline]
                fn from_usize(n: usize) -> Self {
                    n as $t
                }
                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )+
    }
}

numeric_impl!(f32, f64);
