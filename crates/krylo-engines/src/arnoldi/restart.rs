//! Implicit restart of general problems: exact shifts applied through
//! explicit shifted QR steps.

use nalgebra::DMatrix;

use krylo_core::{C64, Scalar};

/// Apply `shifts` to `h`, returning the transformed projection `Q^H H Q`
/// and the accumulated unitary `Q`.
///
/// For real `T`, a complex shift is applied together with its conjugate as
/// one double step `H^2 - 2 Re(mu) H + |mu|^2 I`, so `Q` stays real. The
/// negative-imaginary member of a pair is skipped when its partner is in
/// the list.
pub(crate) fn apply_shifts<T: Scalar>(h: &DMatrix<T>, shifts: &[C64]) -> (DMatrix<T>, DMatrix<T>) {
    let m = h.nrows();
    let mut hp = h.clone();
    let mut q = DMatrix::<T>::identity(m, m);

    for &mu in shifts {
        let p = if T::IS_COMPLEX || mu.im == 0.0 {
            let mut p = hp.clone();
            let shift = T::from_c64(mu);
            for d in 0..m {
                p[(d, d)] -= shift;
            }
            p
        } else if mu.im > 0.0 || !shifts.contains(&mu.conj()) {
            let mut p = &hp * &hp - &hp * T::from_real(2.0 * mu.re);
            let norm_sq = T::from_real(mu.norm_sqr());
            for d in 0..m {
                p[(d, d)] += norm_sq;
            }
            p
        } else {
            continue;
        };

        let qj = p.qr().q();
        hp = qj.adjoint() * &hp * &qj;
        q = &q * &qj;
        clean(&mut hp);
    }
    (hp, q)
}

/// Restore exact upper Hessenberg structure.
fn clean<T: Scalar>(h: &mut DMatrix<T>) {
    let m = h.nrows();
    for j in 0..m {
        for i in j + 2..m {
            h[(i, j)] = T::zero();
        }
    }
}
