//! The bijective index ↔ (levels, indices) ↔ coordinate conversions.
//!
//! This is the combinatorial heart of the crate: it linearises the
//! hierarchical sparse-grid basis into a single contiguous array, grouping
//! points first by boundary-projection dimensionality `pd`, then by which
//! axes are on the boundary and on which side, then by the zero-boundary
//! internal order (see `SPEC_FULL.md` for the derivation; resolved against
//! `examples/original_source/src/Converter.cpp`).

use crate::combinatorics::{combi, total_size, zerob_size};
use crate::error::{Error, Result};

/// A sparse-grid point in `(levels, indices)` form.
///
/// An axis is on the boundary when `levels[i] == -1`, in which case
/// `indices[i] in {0, 1}` selects the low/high corner. Otherwise `levels[i]
/// >= 0` and `indices[i] in [0, 2^levels[i])`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GridPoint {
    /// Per-axis refinement level, or `-1` on the boundary.
    pub levels: Vec<i32>,
    /// Per-axis index within its level (or boundary side).
    pub indices: Vec<usize>,
}

impl GridPoint {
    /// Number of dimensions (length of `levels`/`indices`).
    #[must_use]
    pub fn dims(&self) -> usize {
        self.levels.len()
    }

    /// Number of axes on which this point is interior (not on the boundary).
    #[must_use]
    pub fn pd(&self) -> usize {
        self.levels.iter().filter(|&&l| l != -1).count()
    }

    fn validate(&self) -> Result<()> {
        if self.indices.len() != self.levels.len() {
            return Err(Error::OutOfDomain(
                "levels and indices must have the same length".to_owned(),
            ));
        }

        for (&level, &index) in self.levels.iter().zip(self.indices.iter()) {
            if level == -1 {
                if index > 1 {
                    return Err(Error::OutOfDomain(format!(
                        "boundary axis index must be 0 or 1, got {index}"
                    )));
                }
            } else if level < 0 {
                return Err(Error::OutOfDomain(format!("invalid level {level}")));
            } else if index >= (1usize << level) {
                return Err(Error::OutOfDomain(format!(
                    "index {index} out of range for level {level}"
                )));
            }
        }

        Ok(())
    }

    /// Validates `self` against an expected dimension count, as well as its
    /// own per-axis domain. Used by [`crate::grid::SparseGrid`] at the
    /// boundary of every public operation that takes a caller-supplied point.
    pub(crate) fn validate_domain(&self, d: usize) -> Result<()> {
        if self.dims() != d {
            return Err(Error::OutOfDomain(format!(
                "expected a {d}-dimensional point, got {}",
                self.dims()
            )));
        }
        self.validate()
    }
}

/// Total number of points `N(d, n)`, narrowed to `usize`.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] if the exact count overflows `usize`.
pub fn size(d: usize, n: usize) -> Result<usize> {
    let size = total_size(d, n);
    usize::try_from(size)
        .map_err(|_| Error::InvalidConfiguration(format!("size(d={d}, n={n}) overflows usize")))
}

/// Linearises a zero-boundary `pd`-dimensional point into its position inside
/// the zero-boundary sparse grid of level `n`.
///
/// `levels`/`indices` have length `pd`; `pd = 0` is the trivial one-point grid.
fn zb_gp2idx(levels: &[i32], indices: &[usize]) -> u64 {
    let pd = levels.len();
    debug_assert_eq!(pd, indices.len());

    if pd == 0 {
        return 0;
    }

    let mut index1: u64 = indices[0] as u64;
    for i in 1..pd {
        index1 = (index1 << levels[i]) + indices[i] as u64;
    }

    let mut sum: i64 = 0;
    let mut index2: u64 = 0;
    for (i, &level) in levels.iter().enumerate().take(pd - 1) {
        sum += i64::from(level);
        if sum > 0 {
            index2 += combi(i64::try_from(i).unwrap() + sum, sum - 1);
        }
    }
    sum += i64::from(levels[pd - 1]);
    index2 <<= sum;

    let index3 = zerob_size(pd, usize::try_from(sum).unwrap());

    index1 + index2 + index3
}

/// Inverse of [`zb_gp2idx`]: decodes a position inside a zero-boundary
/// `pd`-dimensional, level-`n` sparse grid into `(levels, indices)`.
fn zb_idx2gp(mut idx: u64, pd: usize) -> (Vec<i32>, Vec<usize>) {
    if pd == 0 {
        return (vec![], vec![]);
    }

    let pd_i64 = i64::try_from(pd).unwrap();
    let mut levels = vec![0i32; pd];
    let mut indices = vec![0usize; pd];

    let mut f: u64 = 1;
    let mut isum: u64 = 0;
    let mut i: i64 = 0;
    while idx >= isum + combi(pd_i64 - 1 + i, i) * f {
        isum += combi(pd_i64 - 1 + i, i) * f;
        f *= 2;
        i += 1;
    }

    let mut sum = i;
    idx -= isum;
    let mut rest = idx % (1u64 << i);
    idx /= 1u64 << i;

    if pd >= 2 {
        for ii in (0..=(pd - 2)).rev() {
            let ii_i64 = i64::try_from(ii).unwrap();
            let mut isum2: u64 = 0;
            let mut j: i64 = 0;
            while idx >= isum2 + combi(ii_i64 + j, j) {
                isum2 += combi(ii_i64 + j, j);
                j += 1;
            }
            let level = sum - j;
            sum = j;
            let width = 1u64 << level;
            let dindex = rest % width;
            rest /= width;
            levels[ii + 1] = i32::try_from(level).unwrap();
            indices[ii + 1] = usize::try_from(dindex).unwrap();
            idx -= isum2;
        }
    }

    let level = sum;
    let width = 1u64 << level;
    let dindex = rest % width;
    levels[0] = i32::try_from(level).unwrap();
    indices[0] = usize::try_from(dindex).unwrap();

    (levels, indices)
}

/// Converts a linear index `k in [0, N(d,n))` to its `(levels, indices)` form.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] if `k >= N(d,n)`.
pub fn idx_to_li(k: usize, d: usize, n: usize) -> Result<GridPoint> {
    let n_points = size(d, n)?;
    if k >= n_points {
        return Err(Error::OutOfRange { index: k, size: n_points });
    }

    let mut index = k as u64;
    let mut n0: usize = 0;
    loop {
        let group_size = (1u64 << n0)
            * combi(i64::try_from(d).unwrap(), i64::try_from(n0).unwrap())
            * zerob_size(d - n0, n);
        if index < group_size {
            break;
        }
        index -= group_size;
        n0 += 1;
    }

    let pd = d - n0;
    let inner = index % zerob_size(pd, n);
    let mut sub_idx = index / zerob_size(pd, n);

    let (plevels, pindices) = zb_idx2gp(inner, pd);

    let mut levels = vec![0i32; d];
    let mut indices = vec![0usize; d];
    let mut j = 0;
    let mut n01 = i64::try_from(n0).unwrap();

    for i in 0..d {
        let threshold_interior = (1u64 << n01) * combi(i64::try_from(d - i - 1).unwrap(), n01 - 1);
        if sub_idx >= threshold_interior {
            levels[i] = plevels[j];
            indices[i] = pindices[j];
            j += 1;
            sub_idx -= threshold_interior;
        } else {
            levels[i] = -1;
            n01 -= 1;
            let threshold_side = (1u64 << n01) * combi(i64::try_from(d - i - 1).unwrap(), n01);
            if sub_idx >= threshold_side {
                indices[i] = 1;
                sub_idx -= threshold_side;
            } else {
                indices[i] = 0;
            }
        }
    }

    Ok(GridPoint { levels, indices })
}

/// Converts a `(levels, indices)` point to its linear index `k in [0, N(d,n))`.
///
/// # Errors
///
/// Returns [`Error::OutOfDomain`] if `point` violates the per-axis domain.
pub fn li_to_idx(point: &GridPoint, n: usize) -> Result<usize> {
    point.validate()?;
    let d = point.dims();

    let pd = point.pd();
    let n0 = d - pd;

    let mut plevels = Vec::with_capacity(pd);
    let mut pindices = Vec::with_capacity(pd);
    for (&level, &index) in point.levels.iter().zip(point.indices.iter()) {
        if level != -1 {
            plevels.push(level);
            pindices.push(index);
        }
    }

    let index1 = zb_gp2idx(&plevels, &pindices);

    let mut index2: u64 = 0;
    let mut n01 = i64::try_from(n0).unwrap();
    for i in 0..d {
        if point.levels[i] != -1 {
            index2 += (1u64 << n01) * combi(i64::try_from(d - i - 1).unwrap(), n01 - 1);
        } else {
            n01 -= 1;
            if point.indices[i] == 1 {
                index2 += (1u64 << n01) * combi(i64::try_from(d - i - 1).unwrap(), n01);
            }
        }
    }
    index2 *= zerob_size(pd, n);

    let mut index3: u64 = 0;
    for i in 0..n0 {
        index3 += (1u64 << i)
            * combi(i64::try_from(d).unwrap(), i64::try_from(i).unwrap())
            * zerob_size(d - i, n);
    }

    let k = index1 + index2 + index3;
    usize::try_from(k).map_err(|_| Error::InvalidConfiguration("index overflows usize".to_owned()))
}

/// Converts a coordinate vector in `[0,1]^d` to its `(levels, indices)` form,
/// axis-wise.
///
/// # Errors
///
/// Returns [`Error::OutOfDomain`] if any coordinate lies outside `[0, 1]`.
pub fn coord_to_li(coords: &[f32]) -> Result<GridPoint> {
    let mut levels = Vec::with_capacity(coords.len());
    let mut indices = Vec::with_capacity(coords.len());

    for &c in coords {
        if !(0.0..=1.0).contains(&c) {
            return Err(Error::OutOfDomain(format!(
                "coordinate {c} is outside [0, 1]"
            )));
        }

        if c == 0.0 {
            levels.push(-1);
            indices.push(0);
        } else if c == 1.0 {
            levels.push(-1);
            indices.push(1);
        } else {
            let mut level: i32 = -1;
            let mut scaled = f64::from(c);
            while scaled.fract() != 0.0 {
                scaled *= 2.0;
                level += 1;
            }
            let index = ((scaled - 1.0) / 2.0).round() as usize;
            levels.push(level);
            indices.push(index);
        }
    }

    Ok(GridPoint { levels, indices })
}

/// Converts a `(levels, indices)` point to its coordinate vector, axis-wise.
///
/// # Errors
///
/// Returns [`Error::OutOfDomain`] if `point` violates the per-axis domain.
pub fn li_to_coord(point: &GridPoint) -> Result<Vec<f32>> {
    point.validate()?;

    Ok(point
        .levels
        .iter()
        .zip(point.indices.iter())
        .map(|(&level, &index)| {
            if level == -1 {
                if index == 0 {
                    0.0
                } else {
                    1.0
                }
            } else {
                (index as f32 + 0.5) / 2f32.powi(level)
            }
        })
        .collect())
}

/// Converts a linear index `k` directly to its coordinate vector.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] if `k >= N(d,n)`.
pub fn idx_to_coord(k: usize, d: usize, n: usize) -> Result<Vec<f32>> {
    li_to_coord(&idx_to_li(k, d, n)?)
}

/// Converts a coordinate vector directly to its linear index.
///
/// # Errors
///
/// Returns [`Error::OutOfDomain`] if any coordinate lies outside `[0, 1]`.
pub fn coord_to_idx(coords: &[f32], n: usize) -> Result<usize> {
    li_to_idx(&coord_to_li(coords)?, n)
}
