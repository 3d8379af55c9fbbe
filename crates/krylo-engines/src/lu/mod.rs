//! Sparse LU factorization engine.
//!
//! Left-looking Gilbert-Peierls factorization `Pr A Pc = L U` with threshold
//! partial pivoting, behind a descriptor-and-status-code interface:
//!
//! - [`CompCol`]: a compressed-column copy of `A` with `i32` indices
//! - [`DenseMut`] / [`DenseRef`]: column-major right-hand sides wrapped in place
//! - [`get_perm_c`]: fill-reducing column orderings
//! - [`gstrf`] / [`gstrs`]: factor and triangular solves
//! - [`gssv`]: factor + solve
//! - [`gssvx`]: expert driver with equilibration, condition estimate and
//!   iterative refinement
//!
//! # Status codes
//!
//! Drivers return an `i32` `info`:
//! - `0`: success
//! - `1..=n`: `U(info, info)` is exactly zero; the factorization completed but
//!   no solution was computed
//! - `n + 1` (expert driver only): the matrix is singular to working precision
//! - `> n + 1`: memory allocation failure, `info - n` bytes were requested
//! - `< 0`: argument `-info` was invalid (1 options, 2 A, 3 perm_c, 4 perm_r,
//!   5 B, 6 X)

mod expert;
mod factor;
mod ordering;

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use expert::{ExpertOutput, gssvx};
pub use factor::{LuFactors, gssv, gstrf, gstrs};
pub use ordering::get_perm_c;

/// Invalid options (pivot threshold outside `[0, 1]`).
pub const ARG_OPTIONS: i32 = -1;
/// Malformed or non-square `A`.
pub const ARG_A: i32 = -2;
/// Bad column permutation.
pub const ARG_PERM_C: i32 = -3;
/// Bad row permutation buffer.
pub const ARG_PERM_R: i32 = -4;
/// Bad right-hand side (or read-only when it must be scaled).
pub const ARG_B: i32 = -5;
/// Bad solution buffer.
pub const ARG_X: i32 = -6;

/// Column ordering applied before factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColPerm {
    Natural,
    /// Minimum degree on the pattern of `A^T A`.
    MmdAtA,
    /// Minimum degree on the pattern of `A^T + A`.
    MmdAtPlusA,
    /// Column approximate minimum degree.
    #[default]
    Colamd,
}

/// Iterative refinement level of the expert driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IterRefine {
    #[default]
    NoRefine,
    /// One correction step.
    Single,
    /// Up to five correction steps with a working-precision residual.
    Double,
    /// Up to five correction steps with a compensated residual.
    Extra,
}

impl IterRefine {
    pub(crate) fn max_steps(self) -> usize {
        match self {
            IterRefine::NoRefine => 0,
            IterRefine::Single => 1,
            IterRefine::Double | IterRefine::Extra => 5,
        }
    }
}

/// Which system a triangular solve addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trans {
    NoTrans,
    Trans,
    ConjTrans,
}

/// Scaling applied by the expert driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Equed {
    #[default]
    None,
    Row,
    Col,
    Both,
}

impl Equed {
    pub fn rows_scaled(self) -> bool {
        matches!(self, Equed::Row | Equed::Both)
    }

    pub fn cols_scaled(self) -> bool {
        matches!(self, Equed::Col | Equed::Both)
    }
}

/// Factorization options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuOptions {
    /// Equilibrate rows and columns (expert driver only).
    pub equil: bool,
    pub col_perm: ColPerm,
    /// Diagonal pivot threshold in `[0, 1]`: the diagonal entry is kept when
    /// its magnitude is at least this fraction of the column maximum.
    pub diag_pivot_thresh: f64,
    /// Favour diagonal pivots for matrices that are nearly symmetric.
    pub symmetric_mode: bool,
    pub iter_refine: IterRefine,
    /// Estimate the reciprocal condition number (expert driver only).
    pub condition_number: bool,
    /// Replace zero or tiny pivots by `eps * max|A|` instead of stopping.
    pub replace_tiny_pivot: bool,
}

impl Default for LuOptions {
    fn default() -> Self {
        Self {
            equil: true,
            col_perm: ColPerm::Colamd,
            diag_pivot_thresh: 1.0,
            symmetric_mode: false,
            iter_refine: IterRefine::NoRefine,
            condition_number: false,
            replace_tiny_pivot: false,
        }
    }
}

impl LuOptions {
    pub(crate) fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.diag_pivot_thresh)
    }

    /// Threshold actually used when choosing between diagonal and maximum.
    pub(crate) fn effective_thresh(&self) -> f64 {
        if self.symmetric_mode {
            self.diag_pivot_thresh.min(SYMMETRIC_MODE_THRESH)
        } else {
            self.diag_pivot_thresh
        }
    }
}

/// Diagonal pivot threshold cap in symmetric mode.
const SYMMETRIC_MODE_THRESH: f64 = 1e-3;

/// Compressed-column matrix descriptor with `i32` indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CompCol<T> {
    nrow: i32,
    ncol: i32,
    colptr: Vec<i32>,
    rowind: Vec<i32>,
    nzval: Vec<T>,
}

impl<T: Copy> CompCol<T> {
    /// Wrap raw arrays. Structure is checked by the drivers, not here.
    pub fn new(nrow: i32, ncol: i32, colptr: Vec<i32>, rowind: Vec<i32>, nzval: Vec<T>) -> Self {
        Self {
            nrow,
            ncol,
            colptr,
            rowind,
            nzval,
        }
    }

    pub fn nrow(&self) -> i32 {
        self.nrow
    }

    pub fn ncol(&self) -> i32 {
        self.ncol
    }

    pub fn nnz(&self) -> usize {
        self.nzval.len()
    }

    pub fn colptr(&self) -> &[i32] {
        &self.colptr
    }

    pub fn rowind(&self) -> &[i32] {
        &self.rowind
    }

    pub fn nzval(&self) -> &[T] {
        &self.nzval
    }

    /// Square with consistent, in-range arrays.
    pub(crate) fn is_valid_square(&self) -> bool {
        if self.nrow < 0 || self.nrow != self.ncol {
            return false;
        }
        let n = self.ncol as usize;
        if self.colptr.len() != n + 1 || self.rowind.len() != self.nzval.len() {
            return false;
        }
        if self.colptr[0] != 0 || self.colptr[n] as usize != self.rowind.len() {
            return false;
        }
        self.colptr.windows(2).all(|w| w[0] <= w[1]) && self.rowind.iter().all(|&r| r >= 0 && r < self.nrow)
    }

    /// Row indices and values of column `j`. Assumes a validated descriptor.
    pub(crate) fn column(&self, j: usize) -> (&[i32], &[T]) {
        let (start, end) = (self.colptr[j] as usize, self.colptr[j + 1] as usize);
        (&self.rowind[start..end], &self.nzval[start..end])
    }

    pub(crate) fn nzval_mut(&mut self) -> &mut [T] {
        &mut self.nzval
    }
}

/// Mutable column-major dense block with leading dimension `lda`.
#[derive(Debug)]
pub struct DenseMut<'a, T> {
    nrow: i32,
    ncol: i32,
    lda: i32,
    data: &'a mut [T],
}

impl<'a, T> DenseMut<'a, T> {
    pub fn new(nrow: i32, ncol: i32, lda: i32, data: &'a mut [T]) -> Self {
        Self { nrow, ncol, lda, data }
    }

    pub fn nrow(&self) -> i32 {
        self.nrow
    }

    pub fn ncol(&self) -> i32 {
        self.ncol
    }

    pub(crate) fn is_valid_for(&self, n: i32) -> bool {
        self.nrow == n && self.ncol >= 0 && self.lda >= n.max(1) && fits(self.lda, self.ncol, self.nrow, self.data.len())
    }

    pub(crate) fn column(&self, j: usize) -> &[T] {
        let start = j * self.lda as usize;
        &self.data[start..start + self.nrow as usize]
    }

    pub(crate) fn column_mut(&mut self, j: usize) -> &mut [T] {
        let start = j * self.lda as usize;
        &mut self.data[start..start + self.nrow as usize]
    }
}

/// Read-only column-major dense block.
#[derive(Debug, Clone, Copy)]
pub struct DenseRef<'a, T> {
    nrow: i32,
    ncol: i32,
    lda: i32,
    data: &'a [T],
}

impl<'a, T> DenseRef<'a, T> {
    pub fn new(nrow: i32, ncol: i32, lda: i32, data: &'a [T]) -> Self {
        Self { nrow, ncol, lda, data }
    }

    pub(crate) fn is_valid_for(&self, n: i32) -> bool {
        self.nrow == n && self.ncol >= 0 && self.lda >= n.max(1) && fits(self.lda, self.ncol, self.nrow, self.data.len())
    }

    pub(crate) fn column(&self, j: usize) -> &[T] {
        let start = j * self.lda as usize;
        &self.data[start..start + self.nrow as usize]
    }
}

fn fits(lda: i32, ncol: i32, nrow: i32, len: usize) -> bool {
    ncol == 0 || (ncol as usize - 1) * lda as usize + nrow as usize <= len
}

/// Right-hand side of the expert driver. Row equilibration rescales `B` in
/// place, which requires the owned form.
#[derive(Debug)]
pub enum Rhs<'a, T> {
    Shared(DenseRef<'a, T>),
    Owned(DenseMut<'a, T>),
}

impl<T> Rhs<'_, T> {
    pub fn ncol(&self) -> i32 {
        match self {
            Rhs::Shared(b) => b.ncol,
            Rhs::Owned(b) => b.ncol,
        }
    }

    pub(crate) fn is_valid_for(&self, n: i32) -> bool {
        match self {
            Rhs::Shared(b) => b.is_valid_for(n),
            Rhs::Owned(b) => b.is_valid_for(n),
        }
    }

    pub(crate) fn column(&self, j: usize) -> &[T] {
        match self {
            Rhs::Shared(b) => b.column(j),
            Rhs::Owned(b) => b.column(j),
        }
    }
}

/// Operation counters for one factor/solve sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    pub factorizations: usize,
    pub factor_ops: u64,
    pub solves: usize,
    pub solve_ops: u64,
    pub refine_steps: usize,
    pub tiny_pivots: usize,
}

impl Stat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} factorization(s), {} factor ops, {} solve(s), {} solve ops, {} refinement step(s), {} replaced pivot(s)",
            self.factorizations, self.factor_ops, self.solves, self.solve_ops, self.refine_steps, self.tiny_pivots
        )
    }
}

/// Status code for an allocation failure of `bytes` bytes.
pub(crate) fn alloc_failure(n: usize, bytes: usize) -> i32 {
    i32::try_from(n.saturating_add(bytes.max(1))).unwrap_or(i32::MAX)
}
