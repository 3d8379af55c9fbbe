//! Linear operator abstraction for matrix-vector products.
//!
//! The operator-driven eigen engine only needs `y = A * x`, so anything that
//! can apply itself to a vector can be handed to it: a sparse matrix, a
//! matrix-free stencil, or a wrapper around a factorization.

use krylo_core::{Scalar, SparseMatrix};

/// A square linear operator that computes `y = A * x`.
pub trait LinearOperator<T: Scalar> {
    /// Dimension of the operator (N x N).
    fn dim(&self) -> usize;

    /// Apply the operator: `y = A * x`.
    ///
    /// `x` and `y` have length `dim()`; `y` is overwritten.
    fn apply(&self, x: &[T], y: &mut [T]);
}

impl<T: Scalar> LinearOperator<T> for SparseMatrix<T> {
    fn dim(&self) -> usize {
        self.n_rows()
    }

    fn apply(&self, x: &[T], y: &mut [T]) {
        self.mul_vec(x, y);
    }
}

impl<T: Scalar, O: LinearOperator<T> + ?Sized> LinearOperator<T> for &O {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn apply(&self, x: &[T], y: &mut [T]) {
        (**self).apply(x, y)
    }
}
