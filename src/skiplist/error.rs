use std::collections::TryReserveError;
use std::error;
use std::fmt;
use std::result;

/// Errors reported by the fallible `SkipList` operations.
#[derive(Debug)]
pub enum Error {
    /// The promotion probability was not strictly between 0 and 1.
    InvalidProbability(f64),
    /// The maximum height was zero.
    InvalidMaxHeight(usize),
    /// A new node could not be allocated. The list was left unchanged.
    AllocationFailure(TryReserveError),
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Error {
        Error::AllocationFailure(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::AllocationFailure(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidProbability(p) => write!(f, "promotion probability {} is not in (0, 1)", p),
            Error::InvalidMaxHeight(height) => write!(f, "maximum height {} must be at least 1", height),
            Error::AllocationFailure(error) => write!(f, "failed to allocate node: {}", error),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::Error;
    use std::error::Error as StdError;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::InvalidProbability(1.5).to_string(),
            "promotion probability 1.5 is not in (0, 1)",
        );
        assert_eq!(
            Error::InvalidMaxHeight(0).to_string(),
            "maximum height 0 must be at least 1",
        );
    }

    #[test]
    fn test_source() {
        let err = Vec::<u64>::new().try_reserve(usize::max_value()).unwrap_err();
        assert!(Error::from(err).source().is_some());
        assert!(Error::InvalidMaxHeight(0).source().is_none());
    }
}
