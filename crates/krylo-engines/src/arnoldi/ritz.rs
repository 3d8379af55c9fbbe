//! Ritz pairs of the projected matrix and their ordering.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};

use krylo_core::{C64, Scalar};

use super::{ArnoldiParams, Problem, Which};

/// Eigen-decomposition of `H` plus convergence bookkeeping for one cycle.
#[derive(Debug, Clone)]
pub(crate) struct RitzState {
    pub values: Vec<C64>,
    /// Unit-norm eigenvectors of `H`, one per column.
    pub vectors: DMatrix<C64>,
    /// Indices into `values`, wanted first.
    pub order: Vec<usize>,
    pub converged: Vec<bool>,
    pub nconv: usize,
    pub rnorm: f64,
    real_general: bool,
}

impl RitzState {
    pub fn compute<T: Scalar>(h: &DMatrix<T>, rnorm: f64, params: &ArnoldiParams) -> Self {
        let hermitian = params.problem == Problem::Hermitian;
        let real_general = !hermitian && !T::IS_COMPLEX;
        let (values, vectors) = if hermitian {
            hermitian_pairs(h)
        } else {
            general_pairs(h)
        };

        let m = values.len();
        let tol = params.effective_tol();
        let eps23 = f64::EPSILON.powf(2.0 / 3.0);
        let converged: Vec<bool> = (0..m)
            .map(|i| rnorm * vectors[(m - 1, i)].norm() <= tol * eps23.max(values[i].norm()))
            .collect();
        let order = sort_order(&values, params.which, real_general, &converged);
        let nconv = order[..params.nev].iter().filter(|&&i| converged[i]).count();

        Self {
            values,
            vectors,
            order,
            converged,
            nconv,
            rnorm,
            real_general,
        }
    }

    /// Size of the compressed factorization kept across a restart.
    ///
    /// Grows with the number of converged values and never separates the two
    /// members of a conjugate pair.
    pub fn restart_size(&self, params: &ArnoldiParams) -> usize {
        let (m, nev) = (params.ncv, params.nev);
        let mut k = nev + self.nconv.min((m - nev) / 2);
        if self.real_general && self.splits_pair(k) {
            if k + 1 < m {
                k += 1;
            } else {
                k -= 1;
            }
        }
        k
    }

    fn splits_pair(&self, k: usize) -> bool {
        let last = self.values[self.order[k - 1]];
        let next = self.values[self.order[k]];
        last.im != 0.0 && next == last.conj()
    }

    /// Ritz values beyond the first `k` in wanted order.
    pub fn unwanted(&self, k: usize) -> Vec<C64> {
        self.order[k..].iter().map(|&i| self.values[i]).collect()
    }
}

fn hermitian_pairs<T: Scalar>(h: &DMatrix<T>) -> (Vec<C64>, DMatrix<C64>) {
    let hs = (h + h.adjoint()) * T::from_real(0.5);
    let eig = hs.symmetric_eigen();
    let values = eig.eigenvalues.iter().map(|&x| C64::new(x, 0.0)).collect();
    (values, eig.eigenvectors.map(|x| x.to_c64()))
}

fn general_pairs<T: Scalar>(h: &DMatrix<T>) -> (Vec<C64>, DMatrix<C64>) {
    let m = h.nrows();
    let hc = h.map(|x| x.to_c64());
    let mut values = schur_eigenvalues(&hc);
    if !T::IS_COMPLEX {
        pair_conjugates(&mut values);
    }

    let mut vectors = DMatrix::zeros(m, m);
    let mut done = vec![false; m];
    for i in 0..m {
        if done[i] {
            continue;
        }
        let theta = values[i];
        let mut x = inverse_iteration(&hc, theta);
        if !T::IS_COMPLEX && theta.im == 0.0 {
            x = realify(x);
        }
        vectors.set_column(i, &x);
        done[i] = true;

        if !T::IS_COMPLEX && theta.im != 0.0 {
            let partner = (i + 1..m).find(|&j| !done[j] && values[j] == theta.conj());
            if let Some(j) = partner {
                vectors.set_column(j, &x.map(|z| z.conj()));
                done[j] = true;
            }
        }
    }
    (values, vectors)
}

/// Eigenvalues from the complex Schur form, resolving any 2x2 bumps left on
/// the subdiagonal.
fn schur_eigenvalues(hc: &DMatrix<C64>) -> Vec<C64> {
    let m = hc.nrows();
    let (_, t) = hc.clone().schur().unpack();
    let mut values = Vec::with_capacity(m);
    let mut i = 0;
    while i < m {
        let scale = (t[(i, i)].norm() + if i + 1 < m { t[(i + 1, i + 1)].norm() } else { 0.0 }).max(f64::MIN_POSITIVE);
        if i + 1 < m && t[(i + 1, i)].norm() > f64::EPSILON * scale {
            let (a, b, c, d) = (t[(i, i)], t[(i, i + 1)], t[(i + 1, i)], t[(i + 1, i + 1)]);
            let half_tr = (a + d) * 0.5;
            let disc = (half_tr * half_tr - (a * d - b * c)).sqrt();
            values.push(half_tr + disc);
            values.push(half_tr - disc);
            i += 2;
        } else {
            values.push(t[(i, i)]);
            i += 1;
        }
    }
    values
}

/// Make the spectrum of a real matrix exactly closed under conjugation:
/// near-real values become real and the remaining values are matched into
/// exact conjugate pairs.
pub(crate) fn pair_conjugates(values: &mut [C64]) {
    let m = values.len();
    let scale = values.iter().map(|z| z.norm()).fold(0.0, f64::max).max(f64::MIN_POSITIVE);
    let real_tol = 100.0 * m as f64 * f64::EPSILON * scale;
    for z in values.iter_mut() {
        if z.im.abs() <= real_tol {
            z.im = 0.0;
        }
    }

    let mut matched = vec![false; m];
    for i in 0..m {
        if matched[i] || values[i].im <= 0.0 {
            continue;
        }
        let target = values[i].conj();
        let partner = (0..m)
            .filter(|&j| !matched[j] && j != i && values[j].im < 0.0)
            .min_by(|&a, &b| {
                let da = (values[a] - target).norm();
                let db = (values[b] - target).norm();
                da.partial_cmp(&db).unwrap_or(Ordering::Equal)
            });
        if let Some(j) = partner {
            let re = 0.5 * (values[i].re + values[j].re);
            let im = 0.5 * (values[i].im - values[j].im);
            values[i] = C64::new(re, im);
            values[j] = C64::new(re, -im);
            matched[i] = true;
            matched[j] = true;
        }
    }
    for (z, &paired) in values.iter_mut().zip(matched.iter()) {
        if !paired {
            z.im = 0.0;
        }
    }
}

/// Eigenvector of `hc` for `theta` by shifted inverse iteration.
fn inverse_iteration(hc: &DMatrix<C64>, theta: C64) -> DVector<C64> {
    let m = hc.nrows();
    let scale = hc.norm().max(f64::MIN_POSITIVE);
    let mut delta = scale * 1e-10;
    for _ in 0..4 {
        let shifted = hc - DMatrix::identity(m, m) * (theta + C64::new(delta, 0.0));
        let lu = shifted.lu();
        let mut x = DVector::from_fn(m, |i, _| C64::new(1.0 / (1.0 + i as f64).sqrt(), 0.0));
        let mut ok = true;
        for _ in 0..3 {
            match lu.solve(&x) {
                Some(y) => {
                    let norm = y.norm();
                    if !norm.is_finite() || norm == 0.0 {
                        ok = false;
                        break;
                    }
                    x = y / C64::new(norm, 0.0);
                }
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            return x;
        }
        delta *= 1e3;
    }
    let mut e = DVector::zeros(m);
    e[0] = C64::new(1.0, 0.0);
    e
}

/// Rotate a vector so its largest entry is real, then drop imaginary parts.
fn realify(x: DVector<C64>) -> DVector<C64> {
    let pivot = x.iter().copied().fold(C64::new(0.0, 0.0), |best, z| if z.norm() > best.norm() { z } else { best });
    if pivot.norm() == 0.0 {
        return x;
    }
    let phase = pivot.conj() / pivot.norm();
    let real = x.map(|z| C64::new((z * phase).re, 0.0));
    let norm = real.norm();
    real / C64::new(norm, 0.0)
}

/// Indices of `values` sorted so that wanted values come first. Conjugate
/// pairs stay adjacent with the positive imaginary part first.
///
/// Values with equal keys are ordered converged first, so a converged value
/// keeps its wanted slot across restarts. This matters for the imaginary
/// orders on real problems, where every real value has key zero.
pub(crate) fn sort_order(values: &[C64], which: Which, real_general: bool, converged: &[bool]) -> Vec<usize> {
    let key = |z: C64| -> f64 {
        match which {
            Which::LargestMagnitude => -z.norm(),
            Which::SmallestMagnitude => z.norm(),
            Which::LargestAlgebraic | Which::LargestReal => -z.re,
            Which::SmallestAlgebraic | Which::SmallestReal => z.re,
            Which::LargestImaginary if real_general => -z.im.abs(),
            Which::LargestImaginary => -z.im,
            Which::SmallestImaginary if real_general => z.im.abs(),
            Which::SmallestImaginary => z.im,
        }
    };
    let cmp = |a: f64, b: f64| a.partial_cmp(&b).unwrap_or(Ordering::Equal);

    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let (za, zb) = (values[a], values[b]);
        cmp(key(za), key(zb))
            .then_with(|| converged[b].cmp(&converged[a]))
            .then_with(|| cmp(za.re, zb.re))
            .then_with(|| cmp(zb.im.abs(), za.im.abs()))
            .then_with(|| cmp(zb.im, za.im))
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> C64 {
        C64::new(re, im)
    }

    #[test]
    fn pairing_makes_exact_conjugates() {
        let mut v = vec![c(1.0, 2.0 + 1e-13), c(3.0, 1e-17), c(1.0 + 1e-13, -2.0)];
        pair_conjugates(&mut v);
        assert_eq!(v[0], v[2].conj());
        assert_eq!(v[1].im, 0.0);
    }

    #[test]
    fn order_keeps_pairs_adjacent() {
        let values = vec![c(1.0, 0.0), c(0.0, -1.0), c(0.0, 1.0), c(-1.0, 0.0)];
        let order = sort_order(&values, Which::LargestMagnitude, true, &[false; 4]);
        let pos_plus = order.iter().position(|&i| i == 2).unwrap();
        let pos_minus = order.iter().position(|&i| i == 1).unwrap();
        assert_eq!(pos_minus, pos_plus + 1);
    }

    #[test]
    fn order_by_real_part() {
        let values = vec![c(2.0, 0.0), c(-5.0, 0.0), c(7.0, 0.0)];
        let none = [false; 3];
        assert_eq!(sort_order(&values, Which::LargestReal, true, &none), vec![2, 0, 1]);
        assert_eq!(sort_order(&values, Which::SmallestMagnitude, true, &none), vec![0, 1, 2]);
        assert_eq!(sort_order(&values, Which::SmallestAlgebraic, false, &none), vec![1, 0, 2]);
    }

    #[test]
    fn imaginary_order_uses_magnitude_for_real_problems() {
        let values = vec![c(0.0, -3.0), c(0.0, 3.0), c(1.0, 0.5), c(1.0, -0.5)];
        let none = [false; 4];
        assert_eq!(sort_order(&values, Which::LargestImaginary, true, &none)[..2], [1, 0]);
        assert_eq!(sort_order(&values, Which::LargestImaginary, false, &none)[0], 1);
        assert_eq!(sort_order(&values, Which::SmallestImaginary, false, &none)[0], 0);
    }

    #[test]
    fn converged_values_win_ties() {
        // Real values all have |Im| = 0 under the imaginary orders.
        let values = vec![c(-2.0, 0.0), c(0.5, 0.0), c(3.0, 0.0), c(1.0, 0.25), c(1.0, -0.25)];
        let none = [false; 5];
        assert_eq!(sort_order(&values, Which::SmallestImaginary, true, &none)[..3], [0, 1, 2]);

        let converged = [false, false, true, false, false];
        let order = sort_order(&values, Which::SmallestImaginary, true, &converged);
        assert_eq!(order[..3], [2, 0, 1]);
        assert_eq!(order[3..], [3, 4]);

        // Unequal keys are never reordered by convergence.
        let order = sort_order(&values, Which::LargestMagnitude, true, &converged);
        assert_eq!(order[0], 2);
        let order = sort_order(&values, Which::SmallestMagnitude, true, &[true, false, false, false, false]);
        assert_eq!(order[0], 1);
    }

    #[test]
    fn general_pairs_of_rotation() {
        // [[1, -5], [5, 1]] has eigenvalues 1 +- 5i
        let h = DMatrix::from_row_slice(2, 2, &[1.0, -5.0, 5.0, 1.0]);
        let (values, vectors) = general_pairs(&h);
        assert_eq!(values[0], values[1].conj());
        assert!((values[0].re - 1.0).abs() < 1e-12);
        assert!((values[0].im.abs() - 5.0).abs() < 1e-12);

        let hc = h.map(|x| C64::new(x, 0.0));
        for i in 0..2 {
            let x = vectors.column(i).into_owned();
            let r = &hc * &x - &x * values[i];
            assert!(r.norm() < 1e-9, "residual {}", r.norm());
        }
        assert_eq!(vectors.column(1).into_owned(), vectors.column(0).map(|z| z.conj()));
    }

    #[test]
    fn real_eigenvectors_are_real() {
        let h = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 0.5, 3.0, 1.0, 0.0, 0.25, 1.0]);
        let (values, vectors) = general_pairs(&h);
        for i in 0..3 {
            assert_eq!(values[i].im, 0.0);
            assert!(vectors.column(i).iter().all(|z| z.im == 0.0));
        }
    }
}
