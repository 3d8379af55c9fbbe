//! Error types for krylo-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{operation}: {engine} engine not available")]
    Unsupported {
        operation: &'static str,
        engine: &'static str,
    },

    #[error("{operation}: matrix must be square, got {n_rows}x{n_cols}")]
    NotSquare {
        operation: &'static str,
        n_rows: usize,
        n_cols: usize,
    },

    #[error("spsolve: over-determined system ({n_rows}x{n_cols})")]
    OverDetermined { n_rows: usize, n_cols: usize },

    #[error("spsolve: under-determined system ({n_rows}x{n_cols})")]
    UnderDetermined { n_rows: usize, n_cols: usize },

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{operation}: n_eigvals = {requested} is too large for a {n}x{n} matrix")]
    EigenCountOutOfRange {
        operation: &'static str,
        requested: usize,
        n: usize,
    },

    #[error("{operation}: unknown form specified ({form})")]
    UnknownForm {
        operation: &'static str,
        form: String,
    },

    #[error("dimension {0} exceeds the factorization engine's index range")]
    IndexOverflow(usize),

    #[error("memory allocation failure ({bytes} bytes)")]
    Allocation { bytes: usize },

    #[error("factorization engine rejected argument {code}")]
    EngineArgument { code: i32 },

    #[error("factorization of the shifted matrix failed with status {status}")]
    Factorization { status: i32 },

    #[error(transparent)]
    Core(#[from] krylo_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
