//! Error types for krylo-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("index ({row}, {col}) out of bounds for {n_rows}x{n_cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        n_rows: usize,
        n_cols: usize,
    },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid sparse structure: {0}")]
    InvalidStructure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
