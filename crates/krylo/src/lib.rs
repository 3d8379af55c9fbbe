//! # Krylo
//!
//! Sparse eigen decomposition and direct sparse linear solves.
//!
//! Krylo provides:
//! - Partial eigen decomposition of symmetric, general real and general
//!   complex sparse matrices by implicitly restarted Arnoldi
//! - Shift-invert for eigenvalues near a shift
//! - Sparse LU solves with equilibration, iterative refinement and
//!   condition estimation
//!
//! ## Quick Start
//!
//! ```rust
//! use krylo::prelude::*;
//!
//! let a = SparseMatrix::from_triplets(3, 3, &[
//!     (0, 0, 2.0), (1, 1, 3.0), (2, 2, 5.0), (0, 1, 1.0), (1, 0, 1.0),
//! ]).unwrap();
//!
//! let b = DMatrix::from_column_slice(3, 1, &[3.0, 4.0, 5.0]);
//! let solved = spsolve(&a, &b, &SolverOptions::default()).unwrap();
//! assert!(solved.success());
//! ```
//!
//! ## Eigenvalues
//!
//! ```rust
//! use krylo::prelude::*;
//!
//! let n = 30;
//! let mut t = Vec::new();
//! for i in 0..n {
//!     t.push((i, i, 2.0));
//!     if i + 1 < n {
//!         t.push((i, i + 1, -1.0));
//!         t.push((i + 1, i, -1.0));
//!     }
//! }
//! let a = SparseMatrix::from_triplets(n, n, &t).unwrap();
//! let res = eigs_sym(&a, &SpectralRequest::new(3, "sm")).unwrap();
//! assert!(res.converged);
//! ```
//!
//! ## Features
//!
//! - `arnoldi` - reverse-communication Arnoldi engine
//! - `operator-eigs` - operator-driven Arnoldi engine for real matrices
//! - `sparse-lu` - sparse LU engine (direct solves and shift-invert)
//! - `serde` - serialization of option and result types
//! - `full` - everything above

// Re-export member crates
pub use krylo_core as core;
pub use krylo_engines as engines;
pub use krylo_solver as solver;

// ============================================================================
// Convenient re-exports from krylo_core
// ============================================================================

pub use krylo_core::{
    C64,
    // Errors
    Error as CoreError,
    Scalar,
    SparseMatrix,
    SpectralForm,
    // Diagnostics
    is_approx_symmetric,
};

// ============================================================================
// Convenient re-exports from krylo_engines
// ============================================================================

pub use krylo_engines::LinearOperator;

// ============================================================================
// Convenient re-exports from krylo_solver
// ============================================================================

#[cfg(any(feature = "arnoldi", feature = "operator-eigs"))]
pub use krylo_solver::{EigenResult, SpectralRequest, eigs_gen, eigs_gen_complex, eigs_sym};
pub use krylo_solver::{
    // Engines
    Capabilities,
    EigenBackend,
    // Options
    EigenOptions,
    // Errors
    Error as SolverError,
    Permutation,
    Refinement,
    RefineDiagnostics,
    SolveReport,
    SolveResult,
    SolveStatus,
    SolverOptions,
    live_resources,
    // Direct solves
    spsolve,
    spsolve_in_place,
    spsolve_refine,
    spsolve_simple,
};

// ============================================================================
// Re-export commonly used external types
// ============================================================================

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

/// Re-export of nalgebra's dynamic matrix type.
pub use nalgebra::DMatrix;

/// Re-export of num_complex's Complex type.
pub use num_complex::Complex;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module containing commonly used types and traits.
///
/// ```rust
/// use krylo::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::{C64, Scalar, SparseMatrix, SpectralForm};

    // Eigen
    #[cfg(any(feature = "arnoldi", feature = "operator-eigs"))]
    pub use crate::{EigenResult, SpectralRequest, eigs_gen, eigs_gen_complex, eigs_sym};
    pub use crate::{Capabilities, EigenOptions};

    // Direct solves
    pub use crate::{SolveResult, SolveStatus, SolverOptions, spsolve};

    // Common external types
    pub use crate::{Complex, DMatrix, DVector};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_features() {
        let caps = Capabilities::detect();
        assert_eq!(caps.arnoldi, cfg!(feature = "arnoldi"));
        assert_eq!(caps.operator_eigs, cfg!(feature = "operator-eigs"));
        assert_eq!(caps.sparse_lu, cfg!(feature = "sparse-lu"));
    }

    #[test]
    fn test_form_roundtrip_through_facade() {
        for form in SpectralForm::ALL {
            assert_eq!(SpectralForm::from(form.mnemonic()), form);
        }
        assert_eq!(SpectralForm::from("x"), SpectralForm::None);
    }

    #[cfg(feature = "sparse-lu")]
    #[test]
    fn test_solve_through_facade() {
        let a = SparseMatrix::<C64>::identity(3);
        let b = DMatrix::from_element(3, 1, Complex::new(1.0, -1.0));
        let res = spsolve(&a, &b, &SolverOptions::refined()).unwrap();
        assert!(res.success());
        assert_eq!(res.x, b);
    }
}
