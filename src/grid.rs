//! The `SparseGrid` type: owns the flat value array and implements
//! construction, hierarchization and evaluation.

use crate::combinatorics::{combi, zerob_size};
use crate::convert::{self, GridPoint};
use crate::error::{Error, Result};
use crate::function::FunctionEval;
use itertools::izip;
use rayon::prelude::*;

/// A non-zero-boundary sparse grid over `[0,1]^d` at refinement level `n`.
///
/// Owns its flat value array exclusively; the array is allocated at
/// construction and released when the `SparseGrid` is dropped.
#[derive(Clone, Debug)]
pub struct SparseGrid {
    d: usize,
    n: usize,
    values: Vec<f32>,
}

impl SparseGrid {
    /// Builds a new sparse grid of dimension `d` and refinement level `n`,
    /// sampling `f` at every grid point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `size(d, n)` overflows
    /// `usize`.
    pub fn new(d: usize, n: usize, f: &impl FunctionEval) -> Result<Self> {
        let size = convert::size(d, n)?;
        let mut values = Vec::with_capacity(size);

        for k in 0..size {
            let coord = convert::idx_to_coord(k, d, n)?;
            values.push(f.value(&coord));
        }

        Ok(Self { d, n, values })
    }

    /// Number of points in the grid, `N(d, n)`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// The static size `N(d, n)` for a grid that would be built with these
    /// parameters, without constructing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `size(d, n)` overflows
    /// `usize`.
    pub fn size_of(d: usize, n: usize) -> Result<usize> {
        convert::size(d, n)
    }

    /// Number of dimensions `d`.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.d
    }

    /// Refinement level `n`.
    #[must_use]
    pub fn level(&self) -> usize {
        self.n
    }

    /// Read-only access to the flat value array, in the linear layout induced
    /// by the converter.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    fn left_right_parent(&self, point: &GridPoint, cd: usize, left: bool) -> Result<Option<GridPoint>> {
        point.validate_domain(self.d)?;
        if cd >= self.d {
            return Err(Error::OutOfDomain(format!(
                "dimension {cd} out of range for d={}",
                self.d
            )));
        }

        let level = point.levels[cd];
        if level == -1 {
            return Ok(None);
        }

        let mut levels = point.levels.clone();
        let mut indices = point.indices.clone();
        let width = 1u32 << level;

        let on_edge = if left {
            point.indices[cd] == 0
        } else {
            point.indices[cd] == (width as usize) - 1
        };

        if on_edge {
            levels[cd] = -1;
            indices[cd] = usize::from(!left);
        } else {
            let numerator = if left {
                point.indices[cd]
            } else {
                point.indices[cd] + 1
            };
            let coord = numerator as f32 / width as f32;
            let axis = convert::coord_to_li(&[coord])?;
            levels[cd] = axis.levels[0];
            indices[cd] = axis.indices[0];
        }

        Ok(Some(GridPoint { levels, indices }))
    }

    /// The left parent of `point` on axis `cd`: the coarser-level grid point
    /// whose hat spans `point` from below on that axis, or `None` if `point`
    /// is already on the boundary of axis `cd`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfDomain`] if `point` or `cd` is malformed.
    pub fn left_parent(&self, point: &GridPoint, cd: usize) -> Result<Option<GridPoint>> {
        self.left_right_parent(point, cd, true)
    }

    /// The right parent of `point` on axis `cd`, symmetric to
    /// [`Self::left_parent`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfDomain`] if `point` or `cd` is malformed.
    pub fn right_parent(&self, point: &GridPoint, cd: usize) -> Result<Option<GridPoint>> {
        self.left_right_parent(point, cd, false)
    }

    /// The first grid point of the next sub-grid in the linear layout, or
    /// `None` if `point`'s sub-grid is the last one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfDomain`] if `point` is malformed.
    pub fn next(&self, point: &GridPoint) -> Result<Option<GridPoint>> {
        point.validate_domain(self.d)?;
        let pd = point.pd();
        let idx = convert::li_to_idx(point, self.n)?;
        let next_idx = idx + usize::try_from(zerob_size(pd, self.n)).unwrap();

        if next_idx >= self.values.len() {
            Ok(None)
        } else {
            Ok(Some(convert::idx_to_li(next_idx, self.d, self.n)?))
        }
    }

    /// Hierarchizes the grid in place: rewrites nodal function values into
    /// hierarchical surplus coefficients.
    ///
    /// One-way transition; `evaluate` assumes surplus form afterwards. The
    /// descending inner loop is load-bearing (see `SPEC_FULL.md`): it
    /// guarantees a point's parents on the current axis have not yet been
    /// updated for that axis when the point itself is updated.
    ///
    /// # Errors
    ///
    /// Returns an error only if an internal conversion fails, which would
    /// indicate a broken invariant.
    pub fn hierarchize(&mut self) -> Result<()> {
        let n_points = self.values.len();

        for cd in 0..self.d {
            for j in (0..n_points).rev() {
                let point = convert::idx_to_li(j, self.d, self.n)?;

                let left_val = match self.left_parent(&point, cd)? {
                    Some(p) => self.values[convert::li_to_idx(&p, self.n)?],
                    None => 0.0,
                };
                let right_val = match self.right_parent(&point, cd)? {
                    Some(p) => self.values[convert::li_to_idx(&p, self.n)?],
                    None => 0.0,
                };

                self.values[j] -= (left_val + right_val) / 2.0;
            }
        }

        Ok(())
    }

    /// Interpolates the (hierarchized) grid at `coords`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfDomain`] if `coords` has the wrong length or a
    /// component outside `[0, 1]`.
    pub fn evaluate(&self, coords: &[f32]) -> Result<f32> {
        self.validate_coords(coords)?;
        self.evaluate_unchecked(coords)
    }

    /// Interpolates the grid at every point in `coords`.
    ///
    /// Queries are independent once the grid is hierarchized (the surplus
    /// array is only read), so this evaluates them concurrently with
    /// `rayon`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfDomain`] if any point has the wrong length or a
    /// component outside `[0, 1]`.
    pub fn evaluate_batch(&self, coords: &[Vec<f32>]) -> Result<Vec<f32>> {
        for c in coords {
            self.validate_coords(c)?;
        }

        coords
            .par_iter()
            .map(|c| self.evaluate_unchecked(c))
            .collect()
    }

    fn validate_coords(&self, coords: &[f32]) -> Result<()> {
        if coords.len() != self.d {
            return Err(Error::OutOfDomain(format!(
                "expected {} coordinates, got {}",
                self.d,
                coords.len()
            )));
        }
        for &c in coords {
            if !(0.0..=1.0).contains(&c) {
                return Err(Error::OutOfDomain(format!(
                    "coordinate {c} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Walks every regular sub-grid contained in the sparse grid, accumulating
    /// a weighted sum of tensorised 1-D hat-function values. `coords` is
    /// assumed already validated.
    fn evaluate_unchecked(&self, coords: &[f32]) -> Result<f32> {
        let mut val = 0.0f32;
        let mut cursor = 0usize;
        let mut pcoords = vec![0.0f32; self.d];

        for pd in (0..=self.d).rev() {
            let n0 = self.d - pd;
            let num_subgrids = usize::try_from(
                (1u64 << n0) * combi(i64::try_from(self.d).unwrap(), i64::try_from(n0).unwrap()),
            )
            .unwrap();

            for _ in 0..num_subgrids {
                let start = convert::idx_to_li(cursor, self.d, self.n)?;

                let mut prod0 = 1.0f32;
                let mut pd_i = 0;
                for k in 0..self.d {
                    if start.levels[k] == -1 {
                        prod0 *= if start.indices[k] == 0 {
                            1.0 - coords[k]
                        } else {
                            coords[k]
                        };
                    } else {
                        pcoords[pd_i] = coords[k];
                        pd_i += 1;
                    }
                }

                if pd == 0 {
                    val += prod0 * self.values[cursor];
                    cursor += 1;
                    continue;
                }

                for s in 0..self.n {
                    for plevels in enumerate_compositions(pd, s) {
                        let mut idxs = vec![0usize; pd];
                        let mut prod = prod0;

                        for (idx_slot, &level, &pc) in izip!(idxs.iter_mut(), &plevels, &pcoords[..pd]) {
                            let width_recip = (1u32 << level) as f32;
                            let width = 1.0 / width_recip;
                            let mut idxk = (pc * width_recip) as usize;
                            let cap = (1usize << level) - 1;
                            if idxk > cap {
                                idxk = cap;
                            }

                            let left = idxk as f32 * width;
                            let m = (2.0 * (pc - left) - width) / width;
                            prod *= (1.0 - m.abs()).max(0.0);
                            *idx_slot = idxk;
                        }

                        let mut index2 = idxs[0];
                        for k in 1..pd {
                            index2 = (index2 << plevels[k]) + idxs[k];
                        }

                        val += prod * self.values[cursor + index2];
                        cursor += 1usize << s;
                    }
                }
            }
        }

        Ok(val)
    }
}

/// Enumerates every composition of `s` into `pd` ordered non-negative parts,
/// in the mixed-radix order used by the zero-boundary bijection (see
/// `SPEC_FULL.md`), via the same in-place odometer as the original
/// implementation.
fn enumerate_compositions(pd: usize, s: usize) -> Vec<Vec<usize>> {
    let mut plevels = vec![0usize; pd];
    plevels[pd - 1] = s;

    let mut result = Vec::with_capacity(usize::try_from(combi(
        i64::try_from(pd - 1 + s).unwrap(),
        i64::try_from(s).unwrap(),
    ))
    .unwrap_or(1));

    loop {
        result.push(plevels.clone());

        if plevels[0] == s {
            break;
        }

        let mut k = 1;
        while plevels[k] == 0 {
            k += 1;
        }
        plevels[k] -= 1;
        let t0 = plevels[0];
        plevels[0] = 0;
        plevels[k - 1] = t0 + 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn product3(coords: &[f32]) -> f32 {
        coords.iter().map(|&x| x * (3.0 - x)).product()
    }

    #[test]
    fn s6_zero_dimensional() {
        let grid = SparseGrid::new(0, 0, &|_: &[f32]| 7.0f32).unwrap();
        assert_eq!(grid.size(), 1);
        let mut grid = grid;
        grid.hierarchize().unwrap();
        assert_approx_eq!(f32, grid.evaluate(&[]).unwrap(), 7.0);
    }

    #[test]
    fn s1_nodal_reconstruction_d3_n3() {
        let d = 3;
        let n = 3;
        let mut grid = SparseGrid::new(d, n, &product3).unwrap();
        grid.hierarchize().unwrap();

        for k in 0..grid.size() {
            let coord = convert::idx_to_coord(k, d, n).unwrap();
            let expected = product3(&coord);
            let got = grid.evaluate(&coord).unwrap();
            let tol = 1e-4 * expected.abs().max(1.0);
            assert!(
                (got - expected).abs() <= tol,
                "k={k} coord={coord:?} got={got} expected={expected}"
            );
        }
    }

    #[test]
    fn s2_nodal_reconstruction_d5_n4_and_sum() {
        let d = 5;
        let n = 4;
        let grid = SparseGrid::new(d, n, &product3).unwrap();

        let sum_before: f32 = grid.values().iter().sum();
        let expected_sum: f32 = (0..grid.size())
            .map(|k| product3(&convert::idx_to_coord(k, d, n).unwrap()))
            .sum();
        assert_approx_eq!(f32, sum_before, expected_sum, epsilon = 1e-2);

        let mut grid = grid;
        grid.hierarchize().unwrap();

        for k in 0..grid.size() {
            let coord = convert::idx_to_coord(k, d, n).unwrap();
            let expected = product3(&coord);
            let got = grid.evaluate(&coord).unwrap();
            let tol = 1e-4 * expected.abs().max(1.0);
            assert!((got - expected).abs() <= tol);
        }
    }

    #[test]
    fn s4_parent_semantics() {
        let grid = SparseGrid::new(2, 2, &|_: &[f32]| 0.0f32).unwrap();
        let point = GridPoint {
            levels: vec![0, 0],
            indices: vec![0, 0],
        };

        let left = grid.left_parent(&point, 0).unwrap().unwrap();
        assert_eq!(left.levels, vec![-1, 0]);
        assert_eq!(left.indices, vec![0, 0]);

        let right = grid.right_parent(&point, 0).unwrap().unwrap();
        assert_eq!(right.levels, vec![-1, 0]);
        assert_eq!(right.indices, vec![1, 0]);
    }

    #[test]
    fn boundary_point_has_no_parent() {
        let grid = SparseGrid::new(1, 2, &|_: &[f32]| 0.0f32).unwrap();
        let point = GridPoint {
            levels: vec![-1],
            indices: vec![0],
        };
        assert!(grid.left_parent(&point, 0).unwrap().is_none());
        assert!(grid.right_parent(&point, 0).unwrap().is_none());
    }

    #[test]
    fn s5_next_walks_every_subgroup() {
        let d = 2;
        let n = 3;
        let grid = SparseGrid::new(d, n, &|_: &[f32]| 0.0f32).unwrap();

        let mut point = convert::idx_to_li(0, d, n).unwrap();
        let mut count = 1;

        while let Some(next) = grid.next(&point).unwrap() {
            count += 1;
            point = next;
        }

        let expected: u64 = (0..=d)
            .map(|n0| (1u64 << n0) * combi(i64::try_from(d).unwrap(), i64::try_from(n0).unwrap()))
            .sum();
        assert_eq!(count, usize::try_from(expected).unwrap());
    }

    #[test]
    fn evaluate_batch_matches_single() {
        let d = 3;
        let n = 3;
        let mut grid = SparseGrid::new(d, n, &product3).unwrap();
        grid.hierarchize().unwrap();

        let points: Vec<Vec<f32>> = (0..grid.size())
            .map(|k| convert::idx_to_coord(k, d, n).unwrap())
            .collect();

        let batch = grid.evaluate_batch(&points).unwrap();
        for (coord, &val) in points.iter().zip(batch.iter()) {
            let single = grid.evaluate(coord).unwrap();
            assert_approx_eq!(f32, single, val);
        }
    }

    #[test]
    fn rejects_wrong_arity() {
        let grid = SparseGrid::new(2, 2, &|_: &[f32]| 0.0f32).unwrap();
        assert!(grid.evaluate(&[0.5]).is_err());
        assert!(grid.evaluate(&[0.5, 1.5]).is_err());
    }
}
