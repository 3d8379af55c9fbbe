//! Sampled symmetry / Hermitian check.
//!
//! The check is a diagnostic, not a proof: it walks the stored nonzeros in
//! column-major order and compares a bounded number of off-diagonal entries
//! against their mirror image. A `false` result is definitive, a `true`
//! result only means no counter-example was sampled.

use crate::scalar::Scalar;
use crate::sparse::SparseMatrix;

/// Relative/absolute leeway on the mirrored comparison.
const SYMMETRY_TOL: f64 = 10_000.0 * f64::EPSILON;

/// Returns `false` when a sampled off-diagonal pair violates `A = A^H`, or
/// (complex kind only) a sampled diagonal entry has a non-negligible
/// imaginary part. Non-square matrices are never symmetric.
pub fn is_approx_symmetric<T: Scalar>(a: &SparseMatrix<T>) -> bool {
    if !a.is_square() {
        return false;
    }

    let a = a.synced();
    let limit = (a.nnz() / 100).max(2);
    let within = |delta: f64, scale: f64| delta <= SYMMETRY_TOL || delta <= scale * SYMMETRY_TOL;

    let mut checked = 1;
    for (row, col, a_ij) in a.iter() {
        if checked > limit {
            break;
        }
        if row == col {
            if a_ij.imaginary().abs() > SYMMETRY_TOL {
                return false;
            }
            continue;
        }

        let a_ji = a.get(col, row);
        // For the real kind the imaginary terms vanish and this reduces to
        // |a_ij - a_ji| against max(|a_ij|, |a_ji|).
        let scale_re = a_ij.real().abs().max(a_ji.real().abs());
        let scale_im = a_ij.imaginary().abs().max(a_ji.imaginary().abs());
        let delta_re = (a_ij.real() - a_ji.real()).abs();
        let delta_im = (a_ij.imaginary() + a_ji.imaginary()).abs();

        if !within(delta_re, scale_re) || !within(delta_im, scale_im) {
            return false;
        }
        checked += 1;
    }
    true
}
