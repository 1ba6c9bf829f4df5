//! Piecewise-linear resampling between frequency grids.
//!
//! Targets outside the source range clamp to the first or last sample, the
//! same boundary behavior as numpy's `interp`. Non-finite frequencies are
//! rejected on either grid.

use num_complex::Complex64;

use crate::error::{Error, Result};

fn check_source(source: &[f64], values_len: usize) -> Result<()> {
    if source.len() != values_len {
        return Err(Error::LengthMismatch {
            expected: source.len(),
            found: values_len,
        });
    }
    if source.len() < 2 {
        return Err(Error::InsufficientPoints(source.len()));
    }
    check_finite(source)?;
    if let Some(i) = source.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(Error::NonIncreasingGrid(i + 1));
    }
    Ok(())
}

fn check_finite(f: &[f64]) -> Result<()> {
    match f.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(Error::NonFiniteGrid(i)),
        None => Ok(()),
    }
}

// Bracketing index and fraction for `target`, or the exact sample index.
enum Position {
    Exact(usize),
    Between(usize, f64),
}

fn locate(source: &[f64], target: f64) -> Position {
    let last = source.len() - 1;
    if target <= source[0] {
        return Position::Exact(0);
    }
    if target >= source[last] {
        return Position::Exact(last);
    }
    let upper = source.partition_point(|&x| x <= target);
    let lower = upper - 1;
    if source[lower] == target {
        return Position::Exact(lower);
    }
    let frac = (target - source[lower]) / (source[upper] - source[lower]);
    Position::Between(lower, frac)
}

/// Resample `values`, given on `source`, onto `target`.
pub fn interpolate(target: &[f64], source: &[f64], values: &[f64]) -> Result<Vec<f64>> {
    check_source(source, values.len())?;
    check_finite(target)?;
    Ok(target
        .iter()
        .map(|&t| match locate(source, t) {
            Position::Exact(i) => values[i],
            Position::Between(i, frac) => values[i] + (values[i + 1] - values[i]) * frac,
        })
        .collect())
}

/// Complex variant of [`interpolate`]; real and imaginary parts are
/// interpolated independently.
pub fn interpolate_complex(
    target: &[f64],
    source: &[f64],
    values: &[Complex64],
) -> Result<Vec<Complex64>> {
    check_source(source, values.len())?;
    check_finite(target)?;
    Ok(target
        .iter()
        .map(|&t| match locate(source, t) {
            Position::Exact(i) => values[i],
            Position::Between(i, frac) => values[i] + (values[i + 1] - values[i]) * frac,
        })
        .collect())
}
