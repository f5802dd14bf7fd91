//! Sparse matrix and conjugate gradient solver.
//!
//! Linear systems are assembled as coordinate triplets `(row, col, value)`
//! and compressed into a CSR matrix for the repeated matrix-vector products
//! of the conjugate gradient loop. The solver targets symmetric positive
//! (semi-)definite systems such as the cotangent Laplacian.

use log::{debug, warn};
use nalgebra::DVector;

use crate::algo::CancelToken;
use crate::error::{PatternError, Result};

/// Relative curvature `pᵀAp / pᵀp` below which the search direction is
/// considered collapsed.
const SINGULAR_EPSILON: f64 = 1e-12;

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted = triplets.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_counts = vec![0usize; rows];
        let mut col_idx = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in sorted {
            if last == Some((row, col)) {
                if let Some(acc) = values.last_mut() {
                    *acc += val;
                }
            } else {
                col_idx.push(col);
                values.push(val);
                row_counts[row] += 1;
                last = Some((row, col));
            }
        }

        let mut row_ptr = Vec::with_capacity(rows + 1);
        row_ptr.push(0);
        for count in row_counts {
            let next = row_ptr[row_ptr.len() - 1] + count;
            row_ptr.push(next);
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(x.len(), self.cols, "vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);
        for i in 0..self.rows {
            let mut sum = 0.0;
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        y
    }
}

/// Options for the conjugate gradient solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverOptions {
    /// Absolute residual norm at which the solve is converged.
    pub tolerance: f64,

    /// Iteration cap.
    pub max_iterations: usize,

    /// Residual norm relative to `‖b‖` that is still accepted as a
    /// best-effort result once the iteration cap is hit.
    pub acceptable_relative_residual: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 1000,
            acceptable_relative_residual: 1e-4,
        }
    }
}

impl SolverOptions {
    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the best-effort acceptance threshold.
    pub fn with_acceptable_relative_residual(mut self, ratio: f64) -> Self {
        self.acceptable_relative_residual = ratio;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0) {
            return Err(PatternError::invalid_param(
                "solver.tolerance",
                self.tolerance,
                "must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(PatternError::invalid_param(
                "solver.max_iterations",
                self.max_iterations,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of a conjugate gradient solve.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The solution vector.
    pub values: DVector<f64>,
    /// Iterations performed.
    pub iterations: usize,
    /// Final residual norm.
    pub residual: f64,
    /// Whether the tolerance was reached (false for best-effort results).
    pub converged: bool,
}

/// Solve A*x = b with the Conjugate Gradient method, starting from x = 0.
///
/// A right-hand side whose norm is already below the tolerance yields the
/// zero vector without iterating. The cancel token, if any, is checked
/// between iterations.
///
/// # Errors
///
/// - [`PatternError::SingularSystem`] if `pᵀAp` collapses before convergence
/// - [`PatternError::ConvergenceFailed`] if the iteration cap is hit and the
///   residual is not acceptable
/// - [`PatternError::Cancelled`] if the token is cancelled mid-solve
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    options: &SolverOptions,
    cancel: Option<&CancelToken>,
) -> Result<Solution> {
    let n = b.len();
    if a.nrows() != n || a.ncols() != n {
        return Err(PatternError::InvalidParameter {
            name: "rhs",
            value: n.to_string(),
            reason: "right-hand side length does not match the square matrix",
        });
    }

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let mut rs_old = r.dot(&r);
    let b_norm = rs_old.sqrt();

    if b_norm < options.tolerance {
        return Ok(Solution {
            values: x,
            iterations: 0,
            residual: b_norm,
            converged: true,
        });
    }

    let mut p = r.clone();

    for iteration in 0..options.max_iterations {
        if let Some(token) = cancel {
            token.check()?;
        }

        let ap = a.mul_vec(&p);
        let p_ap = p.dot(&ap);
        if p_ap <= SINGULAR_EPSILON * p.norm_squared() {
            return Err(PatternError::SingularSystem { iteration });
        }

        let alpha = rs_old / p_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let rs_new = r.dot(&r);
        if rs_new.sqrt() < options.tolerance {
            debug!(
                "conjugate gradient converged in {} iterations (n = {})",
                iteration + 1,
                n
            );
            return Ok(Solution {
                values: x,
                iterations: iteration + 1,
                residual: rs_new.sqrt(),
                converged: true,
            });
        }

        let beta = rs_new / rs_old;
        p = &r + beta * &p;
        rs_old = rs_new;
    }

    let residual = rs_old.sqrt();
    if residual <= options.acceptable_relative_residual * b_norm {
        warn!(
            "conjugate gradient hit {} iterations, accepting residual {:e}",
            options.max_iterations, residual
        );
        Ok(Solution {
            values: x,
            iterations: options.max_iterations,
            residual,
            converged: false,
        })
    } else {
        Err(PatternError::ConvergenceFailed {
            iterations: options.max_iterations,
            residual,
        })
    }
}

/// Solve a system given directly as triplets.
///
/// Convenience wrapper around [`CsrMatrix::from_triplets`] and
/// [`conjugate_gradient`] returning plain values.
pub fn solve(
    triplets: &[(usize, usize, f64)],
    rhs: &[f64],
    size: usize,
    options: &SolverOptions,
) -> Result<Vec<f64>> {
    let a = CsrMatrix::from_triplets(size, size, triplets);
    let b = DVector::from_column_slice(rhs);
    let solution = conjugate_gradient(&a, &b, options, None)?;
    Ok(solution.values.iter().copied().collect())
}
