//! The external `FunctionEval` contract: a callable giving a scalar value for
//! every grid-point coordinate.

/// A callable contract supplying nodal function values during construction.
///
/// Given a coordinate vector of length `d` in `[0,1]^d`, returns a scalar. No
/// statefulness is required; [`crate::grid::SparseGrid::new`] calls this
/// exactly `N(d,n)` times.
pub trait FunctionEval {
    /// Evaluates the function at `coord`.
    fn value(&self, coord: &[f32]) -> f32;
}

impl<F> FunctionEval for F
where
    F: Fn(&[f32]) -> f32,
{
    fn value(&self, coord: &[f32]) -> f32 {
        self(coord)
    }
}
