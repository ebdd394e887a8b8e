//! Fatal diagnostics.
//!
//! Every semantic error in this front-end is fatal: there are no
//! recoverable diagnostics and no error-node recovery in the IR. Errors are
//! carried as [`Fatal`] values and propagated with `?` up to the driver,
//! which prints them with a `path:line` prefix and exits non-zero.

use crate::source::Location;
use thiserror::Error;

/// A fatal, source-located compile error.
#[derive(Debug, Clone, Error)]
#[error("{location}: error: {message}")]
pub struct Fatal {
    pub location: Location,
    pub message: String,
}

impl Fatal {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Result type for every fallible compilation step.
pub type CompileResult<T> = std::result::Result<T, Fatal>;

/// Report a fatal error at the given location and return from the enclosing
/// function.
///
/// ```ignore
/// fatal!(expr.location.clone(), "use of undeclared identifier `{}`", name);
/// ```
#[macro_export]
macro_rules! fatal {
    ($location:expr, $($arg:tt)*) => {
        return Err($crate::diagnostic::Fatal::new($location, format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_display() {
        let err = Fatal::new(Location::new("main.sunder", 12, 4), "something went wrong");
        assert_eq!(err.to_string(), "main.sunder:12: error: something went wrong");
    }

    fn fails() -> CompileResult<()> {
        fatal!(Location::new("x.sunder", 1, 1), "bad {}", "news");
    }

    #[test]
    fn test_fatal_macro_returns_err() {
        let err = fails().unwrap_err();
        assert_eq!(err.message, "bad news");
        assert_eq!(err.location.line, 1);
    }
}
