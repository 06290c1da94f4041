//! Crate-wide error type.

use thiserror::Error;

/// Catch-all error for this crate.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// `d < 0`, `n < 0`, or `size(d, n)` would overflow the platform integer.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A coordinate lies outside `[0, 1]`, or a `(levels, indices)` pair violates the per-axis
    /// domain (e.g. `level = -1` with an index not in `{0, 1}`).
    #[error("coordinate or grid point out of domain: {0}")]
    OutOfDomain(String),
    /// A linear index is `>= size(d, n)`.
    #[error("index {index} out of range for size {size}")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// The size it was checked against.
        size: usize,
    },
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
