//! Sparse eigen decomposition and direct sparse solves for krylo.
//!
//! This crate provides:
//! - Partial eigen decomposition of symmetric, general real and general
//!   complex sparse matrices ([`eigs_sym`], [`eigs_gen`], [`eigs_gen_complex`])
//! - Shift-invert for eigenvalues near a shift, backed by sparse LU
//! - Direct solves of `A X = B` with optional equilibration, iterative
//!   refinement and condition estimation ([`spsolve`])
//! - Capability detection and per-call engine restriction ([`Capabilities`])
//!
//! Engines are selected by cargo features (`arnoldi`, `operator-eigs`,
//! `sparse-lu`); asking for an operation whose engine is missing yields
//! [`Error::Unsupported`].

#[cfg(feature = "sparse-lu")]
mod adapter;
pub mod backend;
pub mod config;
#[cfg(feature = "arnoldi")]
pub mod driver;
#[cfg(any(feature = "arnoldi", feature = "operator-eigs"))]
pub mod eigs;
pub mod error;
pub mod resource;
#[cfg(all(feature = "arnoldi", feature = "sparse-lu"))]
mod shift_invert;
pub mod spsolve;

pub use backend::{Capabilities, EigenBackend};
pub use config::{EigenOptions, Permutation, Refinement, SolverOptions};
#[cfg(any(feature = "arnoldi", feature = "operator-eigs"))]
pub use eigs::{EigenResult, SpectralRequest, eigs_gen, eigs_gen_complex, eigs_sym};
pub use error::{Error, Result};
pub use resource::live_resources;
pub use spsolve::{
    RefineDiagnostics, SolveReport, SolveResult, SolveStatus, spsolve, spsolve_in_place, spsolve_refine,
    spsolve_simple,
};

pub use krylo_core::{C64, Scalar, SparseMatrix, SpectralForm};
