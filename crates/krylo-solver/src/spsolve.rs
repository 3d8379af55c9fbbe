//! Direct sparse solves of `A X = B`.
//!
//! [`spsolve`] is the front door: it takes the simple driver (one factor and
//! solve) unless the options ask for equilibration or refinement, in which
//! case the expert driver runs with a condition estimate.
//!
//! Shape violations are errors. A singular system is not: the result carries
//! a failed [`SolveStatus`] and an empty `x`.

use nalgebra::DMatrix;

use krylo_core::{Scalar, SparseMatrix};

use crate::config::SolverOptions;
use crate::error::{Error, Result};

/// Outcome of a solve that passed its preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    Success,
    /// `U(column, column)` is exactly zero (0-based). A matrix without
    /// nonzeros reports column 0.
    Singular { column: usize },
    /// Singular to working precision and `allow_singular` was not set.
    IllConditioned,
}

/// Diagnostics of the refined driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RefineDiagnostics {
    pub equilibrated_rows: bool,
    pub equilibrated_cols: bool,
    /// Reciprocal pivot growth `max|A| / max|U|` per column, minimised.
    pub pivot_growth: f64,
    /// Estimated forward error bound per right-hand side.
    pub forward_error: Vec<f64>,
    /// Componentwise backward error per right-hand side.
    pub backward_error: Vec<f64>,
}

/// Everything a solve reports besides the solution itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveReport {
    pub status: SolveStatus,
    /// Reciprocal 1-norm condition estimate; refined driver only.
    pub reciprocal_condition: Option<f64>,
    pub diagnostics: Option<RefineDiagnostics>,
}

impl SolveReport {
    fn plain(status: SolveStatus) -> Self {
        Self {
            status,
            reciprocal_condition: None,
            diagnostics: None,
        }
    }

    /// `A` has no nonzeros. The refined driver reports `rcond = 0`.
    fn zero_matrix(refined: bool) -> Self {
        Self {
            reciprocal_condition: refined.then_some(0.0),
            ..Self::plain(SolveStatus::Singular { column: 0 })
        }
    }

    pub fn success(&self) -> bool {
        self.status == SolveStatus::Success
    }
}

/// Solution of `A X = B`. `x` is `n x B.ncols()` on success and empty
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult<T: Scalar> {
    pub x: DMatrix<T>,
    pub report: SolveReport,
}

impl<T: Scalar> SolveResult<T> {
    pub fn success(&self) -> bool {
        self.report.success()
    }

    pub fn reciprocal_condition(&self) -> Option<f64> {
        self.report.reciprocal_condition
    }
}

/// What remains to be done after the shape checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    /// `A` or `B` has no elements: `X` is all zeros.
    Empty,
    /// `A` has no nonzeros.
    ZeroMatrix,
    Factor,
}

fn check_shapes<T: Scalar>(a: &SparseMatrix<T>, b_rows: usize, b_cols: usize) -> Result<Plan> {
    let (n_rows, n_cols) = (a.n_rows(), a.n_cols());
    if n_rows > n_cols {
        return Err(Error::OverDetermined { n_rows, n_cols });
    }
    if n_rows < n_cols {
        return Err(Error::UnderDetermined { n_rows, n_cols });
    }
    if b_rows != n_rows {
        return Err(Error::DimensionMismatch {
            expected: n_rows,
            actual: b_rows,
        });
    }
    if n_rows == 0 || b_cols == 0 {
        return Ok(Plan::Empty);
    }
    if a.nnz() == 0 {
        return Ok(Plan::ZeroMatrix);
    }
    Ok(Plan::Factor)
}

fn unavailable() -> Error {
    Error::Unsupported {
        operation: "spsolve",
        engine: "sparse LU",
    }
}

/// Solve `A X = B`, choosing the simple or refined driver from `options`.
///
/// ```
/// use krylo_core::SparseMatrix;
/// use krylo_solver::{SolverOptions, spsolve};
/// use nalgebra::DMatrix;
///
/// let a = SparseMatrix::from_triplets(2, 2, &[(0, 0, 4.0), (1, 0, 1.0), (1, 1, 2.0)]).unwrap();
/// let b = DMatrix::from_column_slice(2, 1, &[8.0, 4.0]);
/// let res = spsolve(&a, &b, &SolverOptions::default()).unwrap();
/// assert!(res.success());
/// assert!((res.x[(1, 0)] - 1.0).abs() < 1e-12);
/// ```
pub fn spsolve<T: Scalar>(a: &SparseMatrix<T>, b: &DMatrix<T>, options: &SolverOptions) -> Result<SolveResult<T>> {
    let result = if options.needs_refined_driver() {
        spsolve_refine(a, b, options)?
    } else {
        spsolve_simple(a, b, options)?
    };
    advise(&result.report);
    Ok(result)
}

/// Warnings about a finished solve.
fn advise(report: &SolveReport) {
    let rcond = report.reciprocal_condition;
    if report.success() {
        if let Some(rc) = rcond {
            if rc > 0.0 && rc < f64::EPSILON {
                log::warn!("spsolve(): system appears singular (rcond: {rc:e})");
            }
        }
        return;
    }
    match rcond {
        Some(rc) => log::warn!("spsolve(): solution not found (rcond: {rc:e})"),
        None => log::warn!("spsolve(): solution not found"),
    }
}

/// Factor and solve once, without scaling or refinement.
pub fn spsolve_simple<T: Scalar>(a: &SparseMatrix<T>, b: &DMatrix<T>, options: &SolverOptions) -> Result<SolveResult<T>> {
    let mut x = b.clone();
    let report = solve_in_place(a, &mut x, options, false)?;
    Ok(finish(x, report))
}

/// Solve with equilibration, iterative refinement and a condition estimate
/// as configured in `options`. The condition estimate is always reported.
pub fn spsolve_refine<T: Scalar>(a: &SparseMatrix<T>, b: &DMatrix<T>, options: &SolverOptions) -> Result<SolveResult<T>> {
    if !krylo_engines::HAS_SPARSE_LU {
        return Err(unavailable());
    }
    let a = a.synced();
    let mut x = DMatrix::zeros(a.n_cols(), b.ncols());
    let report = match check_shapes(&*a, b.nrows(), b.ncols())? {
        Plan::Empty => SolveReport::plain(SolveStatus::Success),
        Plan::ZeroMatrix => SolveReport::zero_matrix(true),
        Plan::Factor => lu::refined(&*a, b, &mut x, options, options.equilibrate)?,
    };
    Ok(finish(x, report))
}

/// Solve in place: `bx` holds `B` on entry and `X` on return (empty when the
/// solve fails). The refined driver works from a private copy of `B`.
pub fn spsolve_in_place<T: Scalar>(a: &SparseMatrix<T>, bx: &mut DMatrix<T>, options: &SolverOptions) -> Result<SolveReport> {
    let report = solve_in_place(a, bx, options, options.needs_refined_driver())?;
    if !report.success() {
        *bx = DMatrix::zeros(0, 0);
    }
    advise(&report);
    Ok(report)
}

fn solve_in_place<T: Scalar>(a: &SparseMatrix<T>, bx: &mut DMatrix<T>, options: &SolverOptions, refined: bool) -> Result<SolveReport> {
    if !krylo_engines::HAS_SPARSE_LU {
        return Err(unavailable());
    }
    let a = a.synced();
    match check_shapes(&*a, bx.nrows(), bx.ncols())? {
        Plan::Empty => {
            *bx = DMatrix::zeros(a.n_cols(), bx.ncols());
            Ok(SolveReport::plain(SolveStatus::Success))
        }
        Plan::ZeroMatrix => Ok(SolveReport::zero_matrix(refined)),
        Plan::Factor if refined => {
            let b = bx.clone();
            bx.fill(T::zero());
            lu::refined(&*a, &b, bx, options, true)
        }
        Plan::Factor => lu::simple(&*a, bx, options),
    }
}

fn finish<T: Scalar>(x: DMatrix<T>, report: SolveReport) -> SolveResult<T> {
    let x = if report.success() { x } else { DMatrix::zeros(0, 0) };
    SolveResult { x, report }
}

#[cfg(feature = "sparse-lu")]
mod lu {
    use nalgebra::DMatrix;

    use krylo_core::{Scalar, SparseMatrix};
    use krylo_engines::lu::{ExpertOutput, Rhs, gssv, gssvx};

    use super::{RefineDiagnostics, SolveReport, SolveStatus};
    use crate::adapter;
    use crate::config::SolverOptions;
    use crate::error::Result;
    use crate::resource::{FactorWorkspace, PermArray, StatBlock};

    /// Simple driver; `x` holds `B` on entry.
    pub(super) fn simple<T: Scalar>(a: &SparseMatrix<T>, x: &mut DMatrix<T>, options: &SolverOptions) -> Result<SolveReport> {
        let n = a.n_cols();
        let descriptor = adapter::copy_matrix(a)?;
        let mut perm_c = PermArray::new(n)?;
        let mut perm_r = PermArray::new(n)?;
        let mut factors = FactorWorkspace::new();
        let mut stat = StatBlock::new("spsolve");

        let info = {
            let mut rhs = adapter::wrap_dense(x)?;
            gssv(
                &options.to_lu_options(false),
                descriptor.get(),
                perm_c.as_mut_slice(),
                perm_r.as_mut_slice(),
                factors.slot(),
                &mut rhs,
                stat.get_mut(),
            )
        };
        let status = classify(info, n, false)?;
        Ok(SolveReport::plain(status))
    }

    /// Expert driver. `x` must already be zero-filled to `n x B.ncols()`.
    /// `copy_b` makes the driver work on a private copy of `B`, which it may
    /// rescale.
    pub(super) fn refined<T: Scalar>(
        a: &SparseMatrix<T>,
        b: &DMatrix<T>,
        x: &mut DMatrix<T>,
        options: &SolverOptions,
        copy_b: bool,
    ) -> Result<SolveReport> {
        let n = a.n_cols();
        let mut descriptor = adapter::copy_matrix(a)?;
        let mut perm_c = PermArray::new(n)?;
        let mut perm_r = PermArray::new(n)?;
        let mut factors = FactorWorkspace::new();
        let mut stat = StatBlock::new("spsolve (refined)");
        let mut out = ExpertOutput::new();

        let mut b_copy = if copy_b { Some(b.clone()) } else { None };
        let info = {
            let mut rhs = match b_copy.as_mut() {
                Some(m) => Rhs::Owned(adapter::wrap_dense(m)?),
                None => Rhs::Shared(adapter::wrap_dense_ref(b)?),
            };
            let mut sol = adapter::wrap_dense(x)?;
            gssvx(
                &options.to_lu_options(true),
                descriptor.get_mut(),
                perm_c.as_mut_slice(),
                perm_r.as_mut_slice(),
                factors.slot(),
                &mut rhs,
                &mut sol,
                &mut out,
                stat.get_mut(),
            )
        };

        let status = if i64::from(info) == n as i64 + 1 {
            if options.allow_singular {
                log::warn!("spsolve(): system is singular to working precision (rcond: {:e})", out.rcond);
                SolveStatus::Success
            } else {
                SolveStatus::IllConditioned
            }
        } else {
            classify(info, n, true)?
        };

        Ok(SolveReport {
            status,
            reciprocal_condition: Some(out.rcond),
            diagnostics: Some(RefineDiagnostics {
                equilibrated_rows: out.equed.rows_scaled(),
                equilibrated_cols: out.equed.cols_scaled(),
                pivot_growth: out.rpg,
                forward_error: out.ferr,
                backward_error: out.berr,
            }),
        })
    }

    /// Map an engine status other than `n + 1` on the refined path.
    fn classify(info: i32, n: usize, refined: bool) -> Result<SolveStatus> {
        if info == 0 {
            return Ok(SolveStatus::Success);
        }
        if info > 0 && (info as usize) <= n {
            log::debug!("spsolve(): LU factorisation completed, but U({0}, {0}) is zero", info - 1);
            return Ok(SolveStatus::Singular {
                column: info as usize - 1,
            });
        }
        let err = adapter::engine_failure(info, n);
        let driver = if refined { "gssvx" } else { "gssv" };
        log::warn!("spsolve(): {driver} failed: {err}");
        Err(err)
    }
}

#[cfg(not(feature = "sparse-lu"))]
mod lu {
    use nalgebra::DMatrix;

    use krylo_core::{Scalar, SparseMatrix};

    use super::{SolveReport, unavailable};
    use crate::config::SolverOptions;
    use crate::error::Result;

    pub(super) fn simple<T: Scalar>(_: &SparseMatrix<T>, _: &mut DMatrix<T>, _: &SolverOptions) -> Result<SolveReport> {
        Err(unavailable())
    }

    pub(super) fn refined<T: Scalar>(
        _: &SparseMatrix<T>,
        _: &DMatrix<T>,
        _: &mut DMatrix<T>,
        _: &SolverOptions,
        _: bool,
    ) -> Result<SolveReport> {
        Err(unavailable())
    }
}

#[cfg(all(test, feature = "sparse-lu"))]
mod tests {
    use super::*;
    use crate::config::Refinement;
    use crate::resource::live_resources;
    use krylo_core::C64;

    fn singular_2x2() -> SparseMatrix<f64> {
        SparseMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 2.0)]).unwrap()
    }

    #[test]
    fn identity_returns_b() {
        let a = SparseMatrix::<f64>::identity(4);
        let b = DMatrix::from_fn(4, 2, |r, c| (r * 2 + c) as f64);
        let res = spsolve(&a, &b, &SolverOptions::default()).unwrap();
        assert!(res.success());
        assert_eq!(res.x, b);
        assert_eq!(res.reciprocal_condition(), None);
    }

    #[test]
    fn shape_errors() {
        let b = DMatrix::<f64>::zeros(3, 1);
        let tall = SparseMatrix::<f64>::new(3, 2);
        let wide = SparseMatrix::<f64>::new(2, 3);
        assert!(matches!(spsolve(&tall, &b, &SolverOptions::default()), Err(Error::OverDetermined { .. })));
        assert!(matches!(
            spsolve(&wide, &DMatrix::zeros(2, 1), &SolverOptions::default()),
            Err(Error::UnderDetermined { .. })
        ));
        let a = SparseMatrix::<f64>::identity(2);
        assert!(matches!(
            spsolve(&a, &b, &SolverOptions::refined()),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn empty_inputs_give_zeros() {
        let a = SparseMatrix::<f64>::identity(3);
        let res = spsolve(&a, &DMatrix::zeros(3, 0), &SolverOptions::default()).unwrap();
        assert!(res.success());
        assert_eq!(res.x.shape(), (3, 0));

        let empty = SparseMatrix::<f64>::new(0, 0);
        let res = spsolve_refine(&empty, &DMatrix::zeros(0, 2), &SolverOptions::refined()).unwrap();
        assert!(res.success());
        assert_eq!(res.x.shape(), (0, 2));
    }

    #[test]
    fn zero_matrix_fails_softly() {
        let a = SparseMatrix::<f64>::new(3, 3);
        let res = spsolve(&a, &DMatrix::from_element(3, 1, 1.0), &SolverOptions::default()).unwrap();
        assert_eq!(res.report.status, SolveStatus::Singular { column: 0 });
        assert_eq!(res.x.shape(), (0, 0));
        assert_eq!(res.reciprocal_condition(), None);
    }

    #[test]
    fn zero_matrix_refined_reports_zero_rcond() {
        let a = SparseMatrix::<f64>::new(3, 3);
        let b = DMatrix::from_element(3, 1, 1.0);
        let res = spsolve_refine(&a, &b, &SolverOptions::refined()).unwrap();
        assert_eq!(res.report.status, SolveStatus::Singular { column: 0 });
        assert_eq!(res.reciprocal_condition(), Some(0.0));
        assert!(res.x.is_empty());

        let mut bx = b.clone();
        let report = spsolve_in_place(&a, &mut bx, &SolverOptions::refined()).unwrap();
        assert_eq!(report.reciprocal_condition, Some(0.0));
        assert!(bx.is_empty());
    }

    #[test]
    fn singular_simple_reports_zero_pivot() {
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let res = spsolve_simple(&singular_2x2(), &b, &SolverOptions::default()).unwrap();
        assert!(matches!(res.report.status, SolveStatus::Singular { .. }));
        assert!(res.x.is_empty());
    }

    #[test]
    fn singular_refined_needs_allow_singular() {
        let a = singular_2x2();
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);

        let strict = spsolve(&a, &b, &SolverOptions::refined()).unwrap();
        assert!(!strict.success());
        assert_eq!(strict.reciprocal_condition(), Some(0.0));

        let lenient = SolverOptions {
            allow_singular: true,
            ..SolverOptions::refined()
        };
        let res = spsolve(&a, &b, &lenient).unwrap();
        assert!(res.success());
        let rcond = res.reciprocal_condition().unwrap();
        assert!(rcond.is_finite() && rcond < 1e-10, "rcond = {rcond}");
        assert_eq!(res.x.shape(), (2, 1));
    }

    #[test]
    fn refined_reports_diagnostics() {
        let a = SparseMatrix::from_triplets(3, 3, &[(0, 0, 1e6), (1, 1, 1.0), (2, 2, 1e-4), (0, 2, 2.0), (2, 0, 1e-5)]).unwrap();
        let b = DMatrix::from_column_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let opts = SolverOptions {
            refinement: Refinement::Extra,
            ..SolverOptions::refined()
        };
        let res = spsolve(&a, &b, &opts).unwrap();
        assert!(res.success());
        let diag = res.report.diagnostics.as_ref().unwrap();
        assert_eq!(diag.forward_error.len(), 2);
        assert_eq!(diag.backward_error.len(), 2);
        assert!(diag.backward_error.iter().all(|&e| e < 1e-10), "berr {:?}", diag.backward_error);
        assert!(diag.pivot_growth > 0.0);

        let dense = a.to_dense();
        let residual = &dense * &res.x - &b;
        assert!(residual.amax() < 1e-9, "residual {}", residual.amax());
    }

    #[test]
    fn in_place_matches_out_of_place() {
        let a = SparseMatrix::from_triplets(3, 3, &[(0, 0, 3.0), (1, 0, 1.0), (1, 1, 2.0), (2, 1, -1.0), (2, 2, 4.0)]).unwrap();
        let b = DMatrix::from_column_slice(3, 1, &[3.0, 5.0, 7.0]);
        for opts in [SolverOptions::default(), SolverOptions::refined()] {
            let expected = spsolve(&a, &b, &opts).unwrap();
            let mut bx = b.clone();
            let report = spsolve_in_place(&a, &mut bx, &opts).unwrap();
            assert!(report.success());
            assert!((bx - &expected.x).amax() < 1e-14);
        }
    }

    #[test]
    fn complex_system() {
        let i = C64::new(0.0, 1.0);
        let a = SparseMatrix::from_triplets(2, 2, &[(0, 0, C64::new(2.0, 0.0)), (0, 1, i), (1, 1, C64::new(1.0, 1.0))]).unwrap();
        let x_true = DMatrix::from_column_slice(2, 1, &[C64::new(1.0, -1.0), C64::new(0.5, 2.0)]);
        let b = a.to_dense() * &x_true;
        let res = spsolve(&a, &b, &SolverOptions::refined()).unwrap();
        assert!(res.success());
        assert!((res.x - x_true).camax() < 1e-12);
    }

    #[test]
    fn pending_writes_are_solved() {
        let mut a = SparseMatrix::<f64>::identity(2);
        a.set(1, 1, 4.0);
        let res = spsolve(&a, &DMatrix::from_column_slice(2, 1, &[1.0, 8.0]), &SolverOptions::default()).unwrap();
        assert_eq!(res.x[(1, 0)], 2.0);
    }

    #[test]
    fn resources_released_on_every_path() {
        let before = live_resources();
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let _ = spsolve(&singular_2x2(), &b, &SolverOptions::default());
        let _ = spsolve(&singular_2x2(), &b, &SolverOptions::refined());
        let _ = spsolve(&SparseMatrix::<f64>::identity(2), &b, &SolverOptions::refined());
        let bad = SolverOptions {
            pivot_threshold: 2.0,
            ..SolverOptions::default()
        };
        let _ = spsolve(&SparseMatrix::<f64>::identity(2), &b, &bad);
        assert_eq!(live_resources(), before);
    }
}
