//! Error types for solver entry points.
//!
//! Input validation happens once, before any search state is built; the
//! layers below the entry point are total functions on validated inputs
//! and have no error paths of their own. The enum is `#[non_exhaustive]`
//! so variants can be added without breaking callers; consumers should
//! include a fallback match arm.

use std::fmt;

/// Errors rejected by [`solve`](crate::solve) before the search begins.
///
/// An unsatisfiable but well-formed request (no ruler of the requested
/// length exists) is not an error; it yields an empty ruler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SolveError {
    /// Mark count outside the supported envelope.
    MarksOutOfRange { got: u32, min: u32, max: u32 },
    /// Length cap below the minimum any `n`-mark ruler needs.
    MaxLenOutOfRange { got: u32, min: u32 },
    /// Explicit prefix depth beyond `n - 1`.
    PrefixDepthOutOfRange { got: u32, max: u32 },
    /// Explicit initial bound below the minimum any `n`-mark ruler
    /// needs; such a bound could only ever prove infeasibility the
    /// caller already knows.
    InitialBoundOutOfRange { got: u32, min: u32 },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MarksOutOfRange { got, min, max } => {
                write!(f, "mark count {got} out of range [{min}, {max}]")
            }
            Self::MaxLenOutOfRange { got, min } => {
                write!(f, "length cap {got} out of range (minimum {min})")
            }
            Self::PrefixDepthOutOfRange { got, max } => {
                write!(f, "prefix depth {got} out of range [0, {max}]")
            }
            Self::InitialBoundOutOfRange { got, min } => {
                write!(f, "initial bound {got} out of range (minimum {min})")
            }
        }
    }
}

impl std::error::Error for SolveError {}
