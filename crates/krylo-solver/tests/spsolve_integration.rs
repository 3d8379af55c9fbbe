//! Integration tests for direct sparse solves.

use krylo_core::SparseMatrix;
use krylo_solver::{
    Error, Permutation, Refinement, SolveStatus, SolverOptions, live_resources, spsolve, spsolve_in_place,
    spsolve_refine, spsolve_simple,
};
use nalgebra::DMatrix;

/// 2D five-point Laplacian on a `k x k` grid.
fn grid_laplacian(k: usize) -> SparseMatrix<f64> {
    let n = k * k;
    let idx = |i: usize, j: usize| i * k + j;
    let mut t = Vec::new();
    for i in 0..k {
        for j in 0..k {
            t.push((idx(i, j), idx(i, j), 4.0));
            if i + 1 < k {
                t.push((idx(i, j), idx(i + 1, j), -1.0));
                t.push((idx(i + 1, j), idx(i, j), -1.0));
            }
            if j + 1 < k {
                t.push((idx(i, j), idx(i, j + 1), -1.0));
                t.push((idx(i, j + 1), idx(i, j), -1.0));
            }
        }
    }
    SparseMatrix::from_triplets(n, n, &t).unwrap()
}

fn max_residual(a: &SparseMatrix<f64>, x: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a.to_dense() * x - b).amax()
}

#[test]
fn test_identity_solve_returns_b() {
    let a = SparseMatrix::<f64>::identity(5);
    let b = DMatrix::from_fn(5, 3, |r, c| (r as f64) - 2.0 * (c as f64));
    for options in [SolverOptions::default(), SolverOptions::refined()] {
        let res = spsolve(&a, &b, &options).unwrap();
        assert!(res.success());
        assert_eq!(res.x, b, "X != B with {options:?}");
    }
}

#[test]
fn test_every_permutation_solves_grid() {
    let a = grid_laplacian(6);
    let b = DMatrix::from_fn(36, 2, |r, c| ((r * 7 + c * 3) % 11) as f64 - 5.0);
    for name in ["natural", "mmd_ata", "mmd_at_plus_a", "colamd"] {
        let options = SolverOptions {
            permutation: Permutation::from_name(name).unwrap(),
            ..SolverOptions::default()
        };
        let res = spsolve(&a, &b, &options).unwrap();
        assert!(res.success(), "{name} failed");
        let r = max_residual(&a, &res.x, &b);
        assert!(r < 1e-10, "{name}: residual {r}");
    }
}

#[test]
fn test_symmetric_mode_and_threshold() {
    let a = grid_laplacian(5);
    let b = DMatrix::from_element(25, 1, 1.0);
    let options = SolverOptions {
        symmetric: true,
        pivot_threshold: 0.1,
        permutation: Permutation::MmdAtPlusA,
        ..SolverOptions::default()
    };
    let res = spsolve(&a, &b, &options).unwrap();
    assert!(res.success());
    assert!(max_residual(&a, &res.x, &b) < 1e-10);
}

#[test]
fn test_singular_refined_with_and_without_allow_singular() {
    let a = SparseMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 2.0)]).unwrap();
    let b = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);

    let res = spsolve(&a, &b, &SolverOptions::refined()).unwrap();
    assert!(!res.success());
    assert!(res.x.is_empty());

    let options = SolverOptions {
        allow_singular: true,
        ..SolverOptions::refined()
    };
    let res = spsolve(&a, &b, &options).unwrap();
    assert!(res.success());
    let rcond = res.reciprocal_condition().expect("refined solve reports rcond");
    assert!(rcond.is_finite(), "rcond = {rcond}");
    assert!(rcond < f64::EPSILON, "rcond = {rcond} (expected near zero)");
}

#[test]
fn test_ill_conditioned_without_allow_singular() {
    // det(A) = eps: no zero pivot, but rcond is far below machine epsilon.
    let a = SparseMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 1.0 + f64::EPSILON)]).unwrap();
    let b = DMatrix::from_column_slice(2, 1, &[1.0, 1.0]);
    let res = spsolve_refine(&a, &b, &SolverOptions::refined()).unwrap();
    assert_eq!(res.report.status, SolveStatus::IllConditioned);
    assert!(res.reciprocal_condition().unwrap() < f64::EPSILON);
}

#[test]
fn test_refinement_levels_agree() {
    let a = grid_laplacian(4);
    let b = DMatrix::from_fn(16, 1, |r, _| (r as f64).sin());
    let reference = spsolve_simple(&a, &b, &SolverOptions::default()).unwrap();
    for level in ["single", "double", "extra"] {
        let options = SolverOptions {
            refinement: Refinement::from_name(level).unwrap(),
            ..SolverOptions::default()
        };
        let res = spsolve(&a, &b, &options).unwrap();
        assert!(res.success(), "{level} failed");
        let diag = res.report.diagnostics.as_ref().expect("refined diagnostics");
        assert!(!diag.equilibrated_rows && !diag.equilibrated_cols);
        assert!((&res.x - &reference.x).amax() < 1e-12, "{level} disagrees with the simple driver");
        let rcond = res.reciprocal_condition().unwrap();
        assert!(rcond > 0.01 && rcond <= 1.0, "{level}: rcond = {rcond}");
    }
}

#[test]
fn test_in_place_solve() {
    let a = grid_laplacian(3);
    let b = DMatrix::from_fn(9, 2, |r, c| (r + c) as f64);
    let expected = spsolve(&a, &b, &SolverOptions::refined()).unwrap();
    let mut bx = b.clone();
    let report = spsolve_in_place(&a, &mut bx, &SolverOptions::refined()).unwrap();
    assert!(report.success());
    assert!(report.reciprocal_condition.is_some());
    assert!((&bx - &expected.x).amax() < 1e-14);
}

#[test]
fn test_preconditions() {
    let a = SparseMatrix::<f64>::identity(3);
    let err = spsolve(&a, &DMatrix::zeros(4, 1), &SolverOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 4 }));

    let tall = SparseMatrix::<f64>::new(4, 3);
    let err = spsolve_refine(&tall, &DMatrix::zeros(4, 1), &SolverOptions::refined()).unwrap_err();
    assert!(matches!(err, Error::OverDetermined { n_rows: 4, n_cols: 3 }));
}

#[test]
fn test_repeated_solves_are_identical() {
    let a = grid_laplacian(5);
    let b = DMatrix::from_fn(25, 1, |r, _| r as f64);
    let options = SolverOptions::refined();
    let first = spsolve(&a, &b, &options).unwrap();
    let second = spsolve(&a, &b, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_resources_released() {
    let before = live_resources();
    let a = grid_laplacian(4);
    let b = DMatrix::from_element(16, 1, 1.0);
    spsolve(&a, &b, &SolverOptions::default()).unwrap();
    spsolve(&a, &b, &SolverOptions::refined()).unwrap();
    let _ = spsolve(&a, &DMatrix::zeros(3, 1), &SolverOptions::default());
    assert_eq!(live_resources(), before);
}
