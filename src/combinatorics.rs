//! Binomial coefficients and sparse-grid sizes.
//!
//! Both `combi` and `zerob_size` are pure, small, and called very frequently
//! from [`crate::convert`] and [`crate::grid`]; they accumulate in `u64` (the
//! practical envelope is `d, n <= ~10`, see §9 of the design notes) even
//! though callers generally narrow the result to `usize`.

/// Binomial coefficient `C(n, k)`, computed incrementally to avoid overflowing
/// intermediate factorials.
///
/// Returns `0` for `k < 0` or `k > n` (this convention lets callers omit a
/// branch when a per-axis threshold term is conventionally zero, e.g. when
/// `n01 = 0` in the converter's sub-index decode).
#[must_use]
pub fn combi(n: i64, k: i64) -> u64 {
    if k < 0 || n < 0 || k > n {
        return 0;
    }

    let (n, k) = (n as u64, k as u64);
    let mut c: u64 = 1;

    for i in (k + 1)..=n {
        c *= i;
        c /= i - k;
    }

    c
}

/// Number of points in a zero-boundary `d`-dimensional, level-`n` sparse grid.
///
/// `zerob_size(0, n) = 1` for any `n`; otherwise
/// `Σ_{j=0..n-1} 2^j · C(d-1+j, j)`.
#[must_use]
pub fn zerob_size(d: usize, n: usize) -> u64 {
    if d == 0 {
        return 1;
    }

    let d = i64::try_from(d).unwrap();
    (0..n)
        .map(|j| {
            let j = i64::try_from(j).unwrap();
            (1u64 << j) * combi(d - 1 + j, j)
        })
        .sum()
}

/// Total number of points `N(d, n)` in a non-zero-boundary `d`-dimensional,
/// level-`n` sparse grid: `Σ_{i=0..=d} 2^i · C(d,i) · zerob_size(d-i, n)`.
#[must_use]
pub fn total_size(d: usize, n: usize) -> u64 {
    (0..=d)
        .map(|i| {
            (1u64 << i)
                * combi(i64::try_from(d).unwrap(), i64::try_from(i).unwrap())
                * zerob_size(d - i, n)
        })
        .sum()
}
