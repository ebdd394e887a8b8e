//! Source locations for diagnostics.
//!
//! The parser attaches a [`Location`] to every node it produces; the
//! resolver threads those locations through the typed IR so that every
//! diagnostic can cite the offending source position.

use std::fmt;
use std::sync::Arc;

/// A location in source code: file path plus 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Create a new location.
    pub fn new(path: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Self {
            path: path.into(),
            line,
            column,
        }
    }

    /// The location used for entities synthesized by the compiler itself
    /// (builtin types, generated symbols).
    pub fn builtin() -> Self {
        Self::new("<builtin>", 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        let loc = Location::new("main.sunder", 3, 7);
        assert_eq!(loc.to_string(), "main.sunder:3");
    }

    #[test]
    fn test_location_clone_shares_path() {
        let loc = Location::new("lib.sunder", 1, 1);
        let other = loc.clone();
        assert_eq!(loc, other);
    }
}
