//! Numerical engines behind krylo's eigen and solve front ends.
//!
//! - [`arnoldi`]: implicitly restarted Arnoldi driven by reverse communication
//! - [`operator_eigs`]: the same iteration pumped directly from a [`LinearOperator`]
//! - [`lu`]: left-looking sparse LU with column ordering, expert driver and
//!   iterative refinement
//!
//! Each engine sits behind a cargo feature. [`HAS_ARNOLDI`],
//! [`HAS_OPERATOR_EIGS`] and [`HAS_SPARSE_LU`] report what was compiled in.

#[cfg(any(feature = "arnoldi", feature = "operator-eigs"))]
pub mod arnoldi;
#[cfg(feature = "sparse-lu")]
pub mod lu;
pub mod operator;
#[cfg(feature = "operator-eigs")]
pub mod operator_eigs;

pub use operator::LinearOperator;

/// Reverse-communication Arnoldi engine available.
pub const HAS_ARNOLDI: bool = cfg!(feature = "arnoldi");
/// Operator-driven Arnoldi engine available.
pub const HAS_OPERATOR_EIGS: bool = cfg!(feature = "operator-eigs");
/// Sparse LU engine available.
pub const HAS_SPARSE_LU: bool = cfg!(feature = "sparse-lu");
