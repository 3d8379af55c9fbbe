//! Conversions between krylo containers and factorization engine descriptors.

use nalgebra::DMatrix;

use krylo_core::{Scalar, SparseMatrix};
use krylo_engines::lu::{CompCol, DenseMut, DenseRef};

use crate::error::{Error, Result};
use crate::resource::MatrixDescriptor;

/// Narrow a dimension to the engine's index type.
pub(crate) fn to_index(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::IndexOverflow(n))
}

fn reserve<V>(v: &mut Vec<V>, n: usize) -> Result<()> {
    v.try_reserve_exact(n).map_err(|_| Error::Allocation {
        bytes: n.saturating_mul(std::mem::size_of::<V>()),
    })
}

/// Fatal error for an engine status that is neither success nor a
/// singularity report: negative codes name a bad argument, codes beyond
/// `n + 1` carry the failed allocation size plus `n`.
pub(crate) fn engine_failure(info: i32, n: usize) -> Error {
    if info < 0 {
        Error::EngineArgument { code: -info }
    } else {
        Error::Allocation {
            bytes: (info as usize).saturating_sub(n),
        }
    }
}

/// Copy `a` into an owned compressed-column descriptor. Pending writes are
/// folded in first.
pub(crate) fn copy_matrix<T: Scalar>(a: &SparseMatrix<T>) -> Result<MatrixDescriptor<T>> {
    let a = a.synced();
    let nrow = to_index(a.n_rows())?;
    let ncol = to_index(a.n_cols())?;
    to_index(a.nnz())?;

    let mut colptr = Vec::new();
    let mut rowind = Vec::new();
    let mut nzval = Vec::new();
    reserve(&mut colptr, a.n_cols() + 1)?;
    reserve(&mut rowind, a.nnz())?;
    reserve(&mut nzval, a.nnz())?;

    colptr.extend(a.col_ptrs().iter().map(|&p| p as i32));
    rowind.extend(a.row_indices().iter().map(|&r| r as i32));
    nzval.extend_from_slice(a.values());
    Ok(MatrixDescriptor::new(CompCol::new(nrow, ncol, colptr, rowind, nzval)))
}

/// Wrap a dense matrix in place. The engine overwrites it.
pub(crate) fn wrap_dense<T: Scalar>(m: &mut DMatrix<T>) -> Result<DenseMut<'_, T>> {
    let nrow = to_index(m.nrows())?;
    let ncol = to_index(m.ncols())?;
    Ok(DenseMut::new(nrow, ncol, nrow.max(1), m.as_mut_slice()))
}

/// Read-only wrap of a dense matrix.
pub(crate) fn wrap_dense_ref<T: Scalar>(m: &DMatrix<T>) -> Result<DenseRef<'_, T>> {
    let nrow = to_index(m.nrows())?;
    let ncol = to_index(m.ncols())?;
    Ok(DenseRef::new(nrow, ncol, nrow.max(1), m.as_slice()))
}
