//! Compressed sparse column storage with a pending-write cache.
//!
//! Writes through [`SparseMatrix::set`] land in an ordered cache and are only
//! folded into the CSC arrays by [`SparseMatrix::sync`]. Readers that cannot
//! mutate use [`SparseMatrix::synced`], which borrows when nothing is pending
//! and merges into a temporary copy otherwise.

use std::borrow::Cow;
use std::collections::BTreeMap;

use log::trace;
use nalgebra::DMatrix;

use crate::error::{Error, Result};
use crate::scalar::Scalar;

/// Sparse matrix in compressed sparse column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    col_ptrs: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<T>,
    /// Pending writes keyed by (col, row) so merging walks columns in order.
    pending: BTreeMap<(usize, usize), T>,
}

impl<T: Scalar> SparseMatrix<T> {
    /// Create an all-zero `n_rows x n_cols` matrix.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            col_ptrs: vec![0; n_cols + 1],
            row_indices: Vec::new(),
            values: Vec::new(),
            pending: BTreeMap::new(),
        }
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            col_ptrs: (0..=n).collect(),
            row_indices: (0..n).collect(),
            values: vec![T::one(); n],
            pending: BTreeMap::new(),
        }
    }

    /// Build from `(row, col, value)` triplets. Duplicates are summed and
    /// entries that end up exactly zero are dropped.
    pub fn from_triplets(n_rows: usize, n_cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        let mut merged: BTreeMap<(usize, usize), T> = BTreeMap::new();
        for &(row, col, value) in triplets {
            if row >= n_rows || col >= n_cols {
                return Err(Error::IndexOutOfBounds {
                    row,
                    col,
                    n_rows,
                    n_cols,
                });
            }
            *merged.entry((col, row)).or_insert_with(T::zero) += value;
        }
        Ok(Self::from_sorted_entries(n_rows, n_cols, merged))
    }

    /// Build from raw CSC arrays. Row indices must be strictly increasing
    /// within each column.
    pub fn from_csc(
        n_rows: usize,
        n_cols: usize,
        col_ptrs: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if col_ptrs.len() != n_cols + 1 {
            return Err(Error::DimensionMismatch {
                expected: n_cols + 1,
                actual: col_ptrs.len(),
            });
        }
        if row_indices.len() != values.len() {
            return Err(Error::DimensionMismatch {
                expected: row_indices.len(),
                actual: values.len(),
            });
        }
        if col_ptrs[0] != 0 || col_ptrs[n_cols] != row_indices.len() {
            return Err(Error::InvalidStructure(format!(
                "column pointers must span 0..{}",
                row_indices.len()
            )));
        }
        for col in 0..n_cols {
            let (start, end) = (col_ptrs[col], col_ptrs[col + 1]);
            if start > end {
                return Err(Error::InvalidStructure(format!(
                    "column pointers decrease at column {col}"
                )));
            }
            let rows = &row_indices[start..end];
            if let Some(&row) = rows.iter().find(|&&r| r >= n_rows) {
                return Err(Error::IndexOutOfBounds {
                    row,
                    col,
                    n_rows,
                    n_cols,
                });
            }
            if rows.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidStructure(format!(
                    "row indices not strictly increasing in column {col}"
                )));
            }
        }
        Ok(Self {
            n_rows,
            n_cols,
            col_ptrs,
            row_indices,
            values,
            pending: BTreeMap::new(),
        })
    }

    /// Copy the nonzeros of a dense matrix.
    pub fn from_dense(dense: &DMatrix<T>) -> Self {
        let mut entries = BTreeMap::new();
        for col in 0..dense.ncols() {
            for row in 0..dense.nrows() {
                let v = dense[(row, col)];
                if v != T::zero() {
                    entries.insert((col, row), v);
                }
            }
        }
        Self::from_sorted_entries(dense.nrows(), dense.ncols(), entries)
    }

    fn from_sorted_entries(n_rows: usize, n_cols: usize, entries: BTreeMap<(usize, usize), T>) -> Self {
        let mut col_ptrs = vec![0; n_cols + 1];
        let mut row_indices = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for ((col, row), value) in entries {
            if value == T::zero() {
                continue;
            }
            col_ptrs[col + 1] += 1;
            row_indices.push(row);
            values.push(value);
        }
        for col in 0..n_cols {
            col_ptrs[col + 1] += col_ptrs[col];
        }
        Self {
            n_rows,
            n_cols,
            col_ptrs,
            row_indices,
            values,
            pending: BTreeMap::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    /// Number of stored nonzeros. Pending writes are not counted until
    /// [`sync`](Self::sync).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn col_ptrs(&self) -> &[usize] {
        &self.col_ptrs
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Random access to element `(row, col)`, including pending writes.
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(
            row < self.n_rows && col < self.n_cols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.n_rows,
            self.n_cols
        );
        if let Some(&v) = self.pending.get(&(col, row)) {
            return v;
        }
        let (start, end) = (self.col_ptrs[col], self.col_ptrs[col + 1]);
        match self.row_indices[start..end].binary_search(&row) {
            Ok(pos) => self.values[start + pos],
            Err(_) => T::zero(),
        }
    }

    /// Record a write. It becomes visible to [`iter`](Self::iter) and the
    /// raw arrays after the next [`sync`](Self::sync).
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(
            row < self.n_rows && col < self.n_cols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.n_rows,
            self.n_cols
        );
        self.pending.insert((col, row), value);
    }

    pub fn is_synced(&self) -> bool {
        self.pending.is_empty()
    }

    /// Fold pending writes into the CSC arrays.
    pub fn sync(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        trace!("merging {} pending entries into {}x{} matrix", self.pending.len(), self.n_rows, self.n_cols);
        let mut entries: BTreeMap<(usize, usize), T> = self.iter().map(|(r, c, v)| ((c, r), v)).collect();
        entries.append(&mut self.pending);
        *self = Self::from_sorted_entries(self.n_rows, self.n_cols, entries);
    }

    /// A view with no pending writes: borrowed when already synced.
    pub fn synced(&self) -> Cow<'_, Self> {
        if self.is_synced() {
            Cow::Borrowed(self)
        } else {
            let mut copy = self.clone();
            copy.sync();
            Cow::Owned(copy)
        }
    }

    /// Iterate stored nonzeros in column-major order as `(row, col, value)`.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            matrix: self,
            col: 0,
            pos: 0,
        }
    }

    pub fn transpose(&self) -> Self {
        self.map_transposed(|v| v)
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Self {
        self.map_transposed(|v| v.conjugate())
    }

    fn map_transposed(&self, f: impl Fn(T) -> T) -> Self {
        let m = self.synced();
        let entries = m.iter().map(|(r, c, v)| ((r, c), f(v))).collect();
        Self::from_sorted_entries(self.n_cols, self.n_rows, entries)
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.n_rows != other.n_rows || self.n_cols != other.n_cols {
            return Err(Error::DimensionMismatch {
                expected: self.n_rows * self.n_cols,
                actual: other.n_rows * other.n_cols,
            });
        }
        let (a, b) = (self.synced(), other.synced());
        let mut entries: BTreeMap<(usize, usize), T> = a.iter().map(|(r, c, v)| ((c, r), v)).collect();
        for (r, c, v) in b.iter() {
            *entries.entry((c, r)).or_insert_with(T::zero) += v;
        }
        Ok(Self::from_sorted_entries(self.n_rows, self.n_cols, entries))
    }

    /// `A - sigma * I` over the main diagonal.
    pub fn shifted_diagonal(&self, sigma: T) -> Self {
        let m = self.synced();
        let mut entries: BTreeMap<(usize, usize), T> = m.iter().map(|(r, c, v)| ((c, r), v)).collect();
        for i in 0..self.n_rows.min(self.n_cols) {
            *entries.entry((i, i)).or_insert_with(T::zero) -= sigma;
        }
        Self::from_sorted_entries(self.n_rows, self.n_cols, entries)
    }

    /// `y = A * x` over the stored entries.
    pub fn mul_vec(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.n_cols, "x has wrong length");
        assert_eq!(y.len(), self.n_rows, "y has wrong length");
        y.fill(T::zero());
        for (row, col, value) in self.iter() {
            y[row] += value * x[col];
        }
    }

    pub fn to_dense(&self) -> DMatrix<T> {
        let m = self.synced();
        let mut dense = DMatrix::zeros(self.n_rows, self.n_cols);
        for (row, col, value) in m.iter() {
            dense[(row, col)] = value;
        }
        dense
    }
}

/// Iterator over the stored nonzeros of a [`SparseMatrix`].
pub struct Iter<'a, T> {
    matrix: &'a SparseMatrix<T>,
    col: usize,
    pos: usize,
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = (usize, usize, T);

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.matrix;
        if self.pos >= m.values.len() {
            return None;
        }
        while m.col_ptrs[self.col + 1] <= self.pos {
            self.col += 1;
        }
        let item = (m.row_indices[self.pos], self.col, m.values[self.pos]);
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.matrix.values.len() - self.pos;
        (left, Some(left))
    }
}

impl<T: Copy> ExactSizeIterator for Iter<'_, T> {}
