//! Factorization of `A - sigma I` reused by every shift-invert product.

use krylo_core::{Scalar, SparseMatrix};
use krylo_engines::lu::{DenseMut, LuOptions, Trans, get_perm_c, gstrf, gstrs};

use crate::adapter;
use crate::error::{Error, Result};
use crate::resource::{FactorWorkspace, MatrixDescriptor, PermArray, StatBlock};

/// LU factors of the shifted matrix, alive for one eigen run.
pub(crate) struct ShiftInvert<T: Scalar> {
    _descriptor: MatrixDescriptor<T>,
    perm_c: PermArray,
    perm_r: PermArray,
    factors: FactorWorkspace<T>,
    stat: StatBlock,
    n: i32,
}

impl<T: Scalar> ShiftInvert<T> {
    /// Factor `A - sigma I`. The diagonal is only touched when `sigma` is
    /// larger than machine epsilon. A singular shifted matrix is an error.
    pub(crate) fn factorize(a: &SparseMatrix<T>, sigma: T) -> Result<Self> {
        let descriptor = if sigma.modulus() > f64::EPSILON {
            adapter::copy_matrix(&a.shifted_diagonal(sigma))?
        } else {
            adapter::copy_matrix(a)?
        };
        let n = descriptor.get().ncol();
        let nu = n as usize;
        let mut perm_c = PermArray::new(nu)?;
        let mut perm_r = PermArray::new(nu)?;
        let mut factors = FactorWorkspace::new();
        let mut stat = StatBlock::new("shift-invert factorization");

        let options = LuOptions {
            equil: false,
            ..LuOptions::default()
        };
        get_perm_c(options.col_perm, descriptor.get(), perm_c.as_mut_slice());
        let f = gstrf(
            &options,
            descriptor.get(),
            perm_c.as_slice(),
            perm_r.as_mut_slice(),
            stat.get_mut(),
        )
        .map_err(|info| adapter::engine_failure(info, nu))?;
        if f.info() != 0 {
            log::warn!("shift-invert: A - sigma*I is singular (zero pivot in column {})", f.info());
            return Err(Error::Factorization { status: f.info() });
        }
        log::debug!(
            "shift-invert: factored {}x{} shifted matrix, nnz(L)={} nnz(U)={}",
            nu,
            nu,
            f.l_nnz(),
            f.u_nnz()
        );
        *factors.slot() = Some(f);

        Ok(Self {
            _descriptor: descriptor,
            perm_c,
            perm_r,
            factors,
            stat,
            n,
        })
    }

    /// `y = (A - sigma I)^-1 x` by forward and backward substitution.
    pub(crate) fn solve(&mut self, x: &[T], y: &mut [T]) -> Result<()> {
        y.copy_from_slice(x);
        let Some(f) = self.factors.factors() else {
            return Err(Error::Factorization { status: -1 });
        };
        let mut rhs = DenseMut::new(self.n, 1, self.n.max(1), y);
        let info = gstrs(
            Trans::NoTrans,
            f,
            self.perm_c.as_slice(),
            self.perm_r.as_slice(),
            &mut rhs,
            self.stat.get_mut(),
        );
        if info != 0 {
            log::warn!("shift-invert: triangular solve rejected argument {}", -info);
            return Err(adapter::engine_failure(info, self.n as usize));
        }
        Ok(())
    }
}
