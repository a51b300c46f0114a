use std::fmt;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Two operands of `op` have shapes that cannot be combined.
    ShapeMismatch {
        op: &'static str,
        left: Vec<usize>,
        right: Vec<usize>,
    },
    /// A single operand of `op` does not have the shape it needs.
    InvalidShape {
        op: &'static str,
        shape: Vec<usize>,
        expected: &'static str,
    },
    /// A single-element tensor was required.
    NotScalar { shape: Vec<usize> },
    /// A recurrent model was run over zero time steps.
    EmptySequence,
    InvalidConfig(String),
    InvalidData(String),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ShapeMismatch { op, left, right } => {
                write!(f, "shape mismatch in {op}: {left:?} vs {right:?}")
            }
            Error::InvalidShape {
                op,
                shape,
                expected,
            } => write!(f, "invalid shape in {op}: got {shape:?}, expected {expected}"),
            Error::NotScalar { shape } => {
                write!(f, "expected a single element tensor, got shape {shape:?}")
            }
            Error::EmptySequence => write!(f, "sequence must contain at least one step"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
