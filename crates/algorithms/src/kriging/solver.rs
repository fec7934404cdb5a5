//! Dense linear solver for kriging systems
//!
//! Gaussian elimination with partial pivoting, specialized for the small
//! systems of a kriging neighborhood (typically 5–50 unknowns). Columns are
//! eliminated left to right, so a column whose remaining entries all fall
//! below the pivot threshold is linearly dependent on the columns before
//! it. The caller decides how to repair that.

use std::fmt;

use ndarray::{Array1, Array2, ArrayViewMut1, ArrayViewMut2};

/// Why a system could not be solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveFailure {
    /// Column `column` is dependent on the columns before it
    Singular { column: usize },
    /// The matrix or the solution holds NaN or infinite values
    NonFinite,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveFailure::Singular { column } => write!(f, "dependent column {column}"),
            SolveFailure::NonFinite => write!(f, "non-finite values"),
        }
    }
}

/// Solve `a·x = b` in place; on success `b` holds `x`.
///
/// A pivot below `pivot_tolerance × max|aᵢᵢ|` is treated as zero. Returns the
/// ratio of the smallest to the largest pivot magnitude.
pub fn solve_in_place(
    mut a: ArrayViewMut2<f64>,
    mut b: ArrayViewMut1<f64>,
    pivot_tolerance: f64,
) -> Result<f64, SolveFailure> {
    let n = a.nrows();
    debug_assert_eq!(a.ncols(), n);
    debug_assert_eq!(b.len(), n);
    if n == 0 {
        return Ok(1.0);
    }

    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0_f64, f64::max);
    if !scale.is_finite() {
        return Err(SolveFailure::NonFinite);
    }
    let threshold = pivot_tolerance * if scale > 0.0 { scale } else { 1.0 };

    let mut min_pivot = f64::INFINITY;
    let mut max_pivot = 0.0_f64;

    // Forward elimination
    for col in 0..n {
        let mut max_val = a[[col, col]].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let val = a[[row, col]].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val.is_nan() {
            return Err(SolveFailure::NonFinite);
        }
        if max_val < threshold {
            return Err(SolveFailure::Singular { column: col });
        }
        min_pivot = min_pivot.min(max_val);
        max_pivot = max_pivot.max(max_val);

        if max_row != col {
            for j in col..n {
                a.swap([col, j], [max_row, j]);
            }
            b.swap(col, max_row);
        }

        let pivot = a[[col, col]];
        for row in (col + 1)..n {
            let factor = a[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[[row, col]] = 0.0;
            for j in (col + 1)..n {
                a[[row, j]] -= factor * a[[col, j]];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution
    for col in (0..n).rev() {
        let mut sum = b[col];
        for j in (col + 1)..n {
            sum -= a[[col, j]] * b[j];
        }
        b[col] = sum / a[[col, col]];
    }

    if b.iter().any(|v| !v.is_finite()) {
        return Err(SolveFailure::NonFinite);
    }
    Ok(min_pivot / max_pivot)
}

/// Allocating wrapper around [`solve_in_place`]; `a` and `b` are left intact.
pub fn solve(
    a: &Array2<f64>,
    b: &Array1<f64>,
    pivot_tolerance: f64,
) -> Result<(Array1<f64>, f64), SolveFailure> {
    let mut a = a.clone();
    let mut x = b.clone();
    let ratio = solve_in_place(a.view_mut(), x.view_mut(), pivot_tolerance)?;
    Ok((x, ratio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, s};

    #[test]
    fn test_solve_small_system() {
        let a = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let b = array![1.0, 2.0, 3.0];
        let (x, ratio) = solve(&a, &b, 1e-12).unwrap();
        let residual = a.dot(&x) - &b;
        assert!(residual.iter().all(|r| r.abs() < 1e-12), "residual {residual}");
        assert!(ratio > 0.0 && ratio <= 1.0);
    }

    #[test]
    fn test_needs_pivoting() {
        // Zero in the corner, as in an ordinary kriging system
        let a = array![[0.0, 1.0, 1.0], [1.0, 1.0, 0.5], [1.0, 0.5, 1.0]];
        let b = array![1.0, 0.7, 0.4];
        let (x, _) = solve(&a, &b, 1e-12).unwrap();
        let residual = a.dot(&x) - &b;
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn test_dependent_column_reported() {
        // Columns 0 and 1 identical: duplicate samples
        let a = array![[1.0, 1.0, 0.3], [1.0, 1.0, 0.3], [0.3, 0.3, 1.0]];
        let b = array![0.5, 0.5, 0.2];
        assert_eq!(
            solve(&a, &b, 1e-10).unwrap_err(),
            SolveFailure::Singular { column: 1 }
        );
    }

    #[test]
    fn test_non_finite_input() {
        let a = array![[f64::NAN, 0.0], [0.0, 1.0]];
        let b = array![1.0, 1.0];
        assert_eq!(solve(&a, &b, 1e-10).unwrap_err(), SolveFailure::NonFinite);
    }

    #[test]
    fn test_solves_view_of_larger_buffer() {
        let mut buf = Array2::<f64>::from_elem((5, 5), f64::NAN);
        let mut rhs = Array1::<f64>::from_elem(5, f64::NAN);
        buf[[0, 0]] = 2.0;
        buf[[0, 1]] = 1.0;
        buf[[1, 0]] = 1.0;
        buf[[1, 1]] = 2.0;
        rhs[0] = 3.0;
        rhs[1] = 3.0;
        solve_in_place(buf.slice_mut(s![..2, ..2]), rhs.slice_mut(s![..2]), 1e-12).unwrap();
        assert!((rhs[0] - 1.0).abs() < 1e-12);
        assert!((rhs[1] - 1.0).abs() < 1e-12);
    }
}
