//! Core data structures for krylo.
//!
//! This crate provides the pieces shared by the numerical engines and the
//! solver front ends:
//! - [`Scalar`]: the real/complex element kinds every algorithm is written over
//! - [`SparseMatrix`]: compressed sparse column storage with a pending-write cache
//! - [`SpectralForm`]: which part of the spectrum an eigen request targets
//! - [`is_approx_symmetric`]: a cheap sampled symmetry/Hermitian check

pub mod error;
pub mod form;
pub mod scalar;
pub mod sparse;
pub mod symmetry;

pub use error::{Error, Result};
pub use form::SpectralForm;
pub use scalar::{C64, Scalar};
pub use sparse::{Iter, SparseMatrix};
pub use symmetry::is_approx_symmetric;
