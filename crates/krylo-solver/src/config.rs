//! Option structs for the eigen and solve front ends.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for the iterative eigen solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EigenOptions {
    /// Krylov subspace dimension; `0` picks `max(2k + 1, 20)`.
    pub subspace_dim: usize,
    /// Convergence tolerance; values below machine epsilon use epsilon.
    pub tolerance: f64,
    /// Maximum number of restart cycles.
    pub max_iterations: usize,
}

impl Default for EigenOptions {
    fn default() -> Self {
        Self {
            subspace_dim: 0,
            tolerance: 0.0,
            max_iterations: 1000,
        }
    }
}

impl EigenOptions {
    pub fn with_subspace_dim(mut self, subspace_dim: usize) -> Self {
        self.subspace_dim = subspace_dim;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Tolerance actually handed to the engine.
    pub fn effective_tolerance(&self) -> f64 {
        self.tolerance.max(f64::EPSILON)
    }
}

/// Column permutation applied before factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Permutation {
    Natural,
    /// Minimum degree on `A^T A`.
    MmdAtA,
    /// Minimum degree on `A^T + A`.
    MmdAtPlusA,
    #[default]
    Colamd,
}

impl Permutation {
    /// Parse from a name such as `"colamd"` or `"mmd_ata"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "natural" => Some(Self::Natural),
            "mmd_ata" => Some(Self::MmdAtA),
            "mmd_at_plus_a" => Some(Self::MmdAtPlusA),
            "colamd" => Some(Self::Colamd),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::MmdAtA => "mmd_ata",
            Self::MmdAtPlusA => "mmd_at_plus_a",
            Self::Colamd => "colamd",
        }
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Iterative refinement level of the refined solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Refinement {
    #[default]
    None,
    /// One correction step.
    Single,
    /// Up to five correction steps.
    Double,
    /// Up to five correction steps with a compensated residual.
    Extra,
}

impl Refinement {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "extra" => Some(Self::Extra),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Double => "double",
            Self::Extra => "extra",
        }
    }
}

impl fmt::Display for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Options for the direct sparse solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOptions {
    /// Scale rows and columns before factoring.
    pub equilibrate: bool,
    /// The matrix is close to symmetric; prefer diagonal pivots.
    pub symmetric: bool,
    /// Diagonal pivot threshold in `[0, 1]`.
    pub pivot_threshold: f64,
    pub permutation: Permutation,
    pub refinement: Refinement,
    /// Accept a solution when the matrix is singular to working precision.
    pub allow_singular: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            equilibrate: false,
            symmetric: false,
            pivot_threshold: 1.0,
            permutation: Permutation::Colamd,
            refinement: Refinement::None,
            allow_singular: false,
        }
    }
}

impl SolverOptions {
    /// Equilibration with double refinement.
    pub fn refined() -> Self {
        Self {
            equilibrate: true,
            refinement: Refinement::Double,
            ..Self::default()
        }
    }

    /// Whether the refined driver is required.
    pub fn needs_refined_driver(&self) -> bool {
        self.equilibrate || self.refinement != Refinement::None
    }

    /// Pivot threshold clamped into `[0, 1]`.
    pub fn clamped_pivot_threshold(&self) -> f64 {
        let t = self.pivot_threshold;
        if t.is_nan() || !(0.0..=1.0).contains(&t) {
            let clamped = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
            log::warn!("spsolve: pivot_threshold {} outside [0, 1]; using {}", t, clamped);
            clamped
        } else {
            t
        }
    }

    /// Engine options for the simple (`refined == false`) or refined driver.
    #[cfg(feature = "sparse-lu")]
    pub(crate) fn to_lu_options(&self, refined: bool) -> krylo_engines::lu::LuOptions {
        use krylo_engines::lu::{ColPerm, IterRefine, LuOptions};

        let col_perm = match self.permutation {
            Permutation::Natural => ColPerm::Natural,
            Permutation::MmdAtA => ColPerm::MmdAtA,
            Permutation::MmdAtPlusA => ColPerm::MmdAtPlusA,
            Permutation::Colamd => ColPerm::Colamd,
        };
        let iter_refine = match self.refinement {
            Refinement::None => IterRefine::NoRefine,
            Refinement::Single => IterRefine::Single,
            Refinement::Double => IterRefine::Double,
            Refinement::Extra => IterRefine::Extra,
        };
        LuOptions {
            equil: refined && self.equilibrate,
            col_perm,
            diag_pivot_thresh: self.clamped_pivot_threshold(),
            symmetric_mode: self.symmetric,
            iter_refine: if refined { iter_refine } else { IterRefine::NoRefine },
            condition_number: refined,
            replace_tiny_pivot: refined && self.allow_singular,
        }
    }
}
