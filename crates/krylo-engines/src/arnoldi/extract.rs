//! Post-processing of a finished run: Ritz vectors and eigenvalues in the
//! caller's coordinates.

use nalgebra::{DMatrix, DVector};

use krylo_core::{C64, Scalar};

use super::ritz::RitzState;
use super::{ArnoldiEngine, Mode, Problem};

/// Real eigenvalues with their eigenvectors (Hermitian problems).
#[derive(Debug, Clone)]
pub struct HermitianPairs<T> {
    pub values: Vec<f64>,
    /// `n x k`, one unit-norm eigenvector per column.
    pub vectors: DMatrix<T>,
}

/// Complex eigenvalues with complex eigenvectors.
#[derive(Debug, Clone)]
pub struct ComplexPairs {
    pub values: Vec<C64>,
    pub vectors: DMatrix<C64>,
}

/// Packed output of a real general problem.
///
/// A conjugate pair `(dr[i] +- i di[i])` with `di[i] > 0` occupies columns
/// `i` and `i + 1` of `z` as the real and imaginary parts of the eigenvector
/// for `dr[i] + i di[i]`. `z` has `nev + 1` columns so a pair starting at the
/// last wanted position still fits.
#[derive(Debug, Clone)]
pub struct PackedRealPairs {
    pub dr: Vec<f64>,
    pub di: Vec<f64>,
    pub z: DMatrix<f64>,
    pub nev: usize,
}

impl<T: Scalar> ArnoldiEngine<T> {
    /// Indices of the wanted Ritz pairs in wanted order.
    fn wanted(&self, only_converged: bool) -> Option<Vec<usize>> {
        if !self.is_done() {
            return None;
        }
        let ritz = self.ritz.as_ref()?;
        Some(
            ritz.order[..self.params.nev]
                .iter()
                .copied()
                .filter(|&i| !only_converged || ritz.converged[i])
                .collect(),
        )
    }

    fn eigenvalue(&self, theta: C64) -> C64 {
        match self.params.mode {
            Mode::Regular => theta,
            Mode::ShiftInvert { sigma } => sigma + C64::new(1.0, 0.0) / theta,
        }
    }

    /// `x = V s` for an eigenvector `s` of the projection.
    fn ritz_vector(&self, ritz: &RitzState, idx: usize) -> DVector<C64> {
        let s = ritz.vectors.column(idx);
        DVector::from_fn(self.params.n, |r, _| {
            (0..self.params.ncv).fold(C64::new(0.0, 0.0), |acc, j| acc + self.v[(r, j)].to_c64() * s[j])
        })
    }

    /// Eigenpairs of a Hermitian problem in wanted order.
    ///
    /// With `only_converged` set, pairs that did not meet the tolerance are
    /// dropped; otherwise all `nev` wanted pairs are returned.
    pub fn hermitian_pairs(&self, only_converged: bool) -> Option<HermitianPairs<T>> {
        if self.params.problem != Problem::Hermitian {
            return None;
        }
        let ritz = self.ritz.as_ref()?;
        let wanted = self.wanted(only_converged)?;
        let mut vectors = DMatrix::zeros(self.params.n, wanted.len());
        let mut values = Vec::with_capacity(wanted.len());
        for (col, &idx) in wanted.iter().enumerate() {
            values.push(self.eigenvalue(ritz.values[idx]).re);
            let x = self.ritz_vector(ritz, idx);
            vectors.set_column(col, &x.map(T::from_c64));
        }
        Some(HermitianPairs { values, vectors })
    }

    /// Eigenpairs of a general problem as complex values and vectors.
    pub fn complex_pairs(&self, only_converged: bool) -> Option<ComplexPairs> {
        if self.params.problem != Problem::General {
            return None;
        }
        let ritz = self.ritz.as_ref()?;
        let wanted = self.wanted(only_converged)?;
        let mut vectors = DMatrix::zeros(self.params.n, wanted.len());
        let mut values = Vec::with_capacity(wanted.len());
        for (col, &idx) in wanted.iter().enumerate() {
            values.push(self.eigenvalue(ritz.values[idx]));
            vectors.set_column(col, &self.ritz_vector(ritz, idx));
        }
        Some(ComplexPairs { values, vectors })
    }
}

impl ArnoldiEngine<f64> {
    /// Packed real eigen output of a real general problem.
    pub fn packed_real_pairs(&self) -> Option<PackedRealPairs> {
        if self.params.problem != Problem::General {
            return None;
        }
        let ritz = self.ritz.as_ref()?;
        self.wanted(false)?;
        let (n, nev) = (self.params.n, self.params.nev);

        let mut dr = vec![0.0; nev + 1];
        let mut di = vec![0.0; nev + 1];
        let mut z = DMatrix::zeros(n, nev + 1);
        let mut i = 0;
        while i < nev {
            let idx = ritz.order[i];
            let lambda = self.eigenvalue(ritz.values[idx]);
            let x = self.ritz_vector(ritz, idx);
            dr[i] = lambda.re;
            di[i] = lambda.im;
            if ritz.values[idx].im == 0.0 {
                z.set_column(i, &x.map(|c| c.re));
                i += 1;
                continue;
            }
            dr[i + 1] = lambda.re;
            di[i + 1] = -lambda.im;
            z.set_column(i, &x.map(|c| c.re));
            z.set_column(i + 1, &x.map(|c| c.im));
            i += 2;
        }
        Some(PackedRealPairs { dr, di, z, nev })
    }
}
