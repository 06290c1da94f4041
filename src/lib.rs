//! A compact, index-addressable non-zero-boundary sparse grid over
//! `[0,1]^d`, with bijective conversions between linear index,
//! `(levels, indices)` and coordinate form, and a hierarchization/evaluation
//! pair built on the hat-function basis.
//!
//! See `SPEC_FULL.md` in the repository root for the full specification this
//! crate implements, and `DESIGN.md` for the grounding of each module.

#![warn(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

mod combinatorics;
mod convert;
mod error;
mod function;
mod grid;

pub use combinatorics::{combi, total_size, zerob_size};
pub use convert::{
    coord_to_idx, coord_to_li, idx_to_coord, idx_to_li, li_to_coord, li_to_idx, size, GridPoint,
};
pub use error::{Error, Result};
pub use function::FunctionEval;
pub use grid::SparseGrid;
