//! Expert driver: equilibration, factorization, condition estimate, solve
//! and iterative refinement in one call.

use log::{debug, trace};

use krylo_core::{C64, Scalar};

use super::factor::inverse_permutation;
use super::{
    ARG_A, ARG_B, ARG_OPTIONS, ARG_PERM_C, ARG_PERM_R, ARG_X, CompCol, DenseMut, Equed, IterRefine, LuFactors,
    LuOptions, Rhs, Stat, Trans, get_perm_c, gstrf,
};

/// Scaling is skipped when row or column ratios stay above this.
const EQUIL_THRESH: f64 = 0.1;
/// Iterations of the one-norm estimator.
const LACON_ITERS: usize = 5;

/// Diagnostics filled by [`gssvx`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertOutput {
    pub equed: Equed,
    /// Row scale factors (all ones unless rows were scaled).
    pub r: Vec<f64>,
    /// Column scale factors.
    pub c: Vec<f64>,
    /// Reciprocal pivot growth `min_j max|A_j| / max|U_j|`.
    pub rpg: f64,
    /// Reciprocal one-norm condition estimate; `0` when not computed.
    pub rcond: f64,
    /// Forward error bound per right-hand side.
    pub ferr: Vec<f64>,
    /// Componentwise relative backward error per right-hand side.
    pub berr: Vec<f64>,
}

impl Default for ExpertOutput {
    fn default() -> Self {
        Self {
            equed: Equed::None,
            r: Vec::new(),
            c: Vec::new(),
            rpg: 1.0,
            rcond: 0.0,
            ferr: Vec::new(),
            berr: Vec::new(),
        }
    }
}

impl ExpertOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Scaling {
    r: Vec<f64>,
    c: Vec<f64>,
    rowcnd: f64,
    colcnd: f64,
    amax: f64,
}

/// Row and column scalings that bring the largest entry of every row and
/// column towards one. `None` if some row or column is entirely zero.
fn gsequ<T: Scalar>(a: &CompCol<T>) -> Option<Scaling> {
    let n = a.ncol() as usize;
    let small = f64::MIN_POSITIVE / f64::EPSILON;
    let big = 1.0 / small;

    let mut r = vec![0.0f64; n];
    for j in 0..n {
        let (rows, vals) = a.column(j);
        for (&i, v) in rows.iter().zip(vals) {
            r[i as usize] = r[i as usize].max(v.modulus());
        }
    }
    let amax = r.iter().copied().fold(0.0, f64::max);
    let rcmin = r.iter().copied().fold(f64::INFINITY, f64::min);
    if n > 0 && rcmin == 0.0 {
        return None;
    }
    for ri in r.iter_mut() {
        *ri = 1.0 / ri.clamp(small, big);
    }
    let rowcnd = if n == 0 { 1.0 } else { rcmin.max(small) / amax.min(big) };

    let mut c = vec![0.0f64; n];
    for (j, cj) in c.iter_mut().enumerate() {
        let (rows, vals) = a.column(j);
        *cj = rows
            .iter()
            .zip(vals)
            .map(|(&i, v)| v.modulus() * r[i as usize])
            .fold(0.0, f64::max);
    }
    let cmax = c.iter().copied().fold(0.0, f64::max);
    let cmin = c.iter().copied().fold(f64::INFINITY, f64::min);
    if n > 0 && cmin == 0.0 {
        return None;
    }
    for cj in c.iter_mut() {
        *cj = 1.0 / cj.clamp(small, big);
    }
    let colcnd = if n == 0 { 1.0 } else { cmin.max(small) / cmax.min(big) };

    Some(Scaling {
        r,
        c,
        rowcnd,
        colcnd,
        amax,
    })
}

/// Decide which scalings are worth applying.
fn laqgs_decision(s: &Scaling) -> Equed {
    let small = f64::MIN_POSITIVE / f64::EPSILON;
    let large = 1.0 / small;
    let rows_ok = s.rowcnd >= EQUIL_THRESH && s.amax >= small && s.amax <= large;
    match (rows_ok, s.colcnd >= EQUIL_THRESH) {
        (true, true) => Equed::None,
        (true, false) => Equed::Col,
        (false, true) => Equed::Row,
        (false, false) => Equed::Both,
    }
}

fn one_norm<T: Scalar>(a: &CompCol<T>) -> f64 {
    (0..a.ncol() as usize)
        .map(|j| a.column(j).1.iter().map(|v| v.modulus()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Hager-Higham estimate of `||A^-1||_1` from the factors.
fn inverse_one_norm<T: Scalar>(f: &LuFactors<T>, perm_c: &[i32], perm_r: &[i32], stat: &mut Stat) -> f64 {
    let n = f.n();
    if n == 0 {
        return 0.0;
    }
    let mut w = vec![T::zero(); n];
    let mut x = vec![T::from_real(1.0 / n as f64); n];
    stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, &mut x, &mut w);
    let norm1 = |x: &[T]| x.iter().map(|v| v.modulus()).sum::<f64>();
    let mut est = norm1(&x);
    if n == 1 {
        return est;
    }

    let mut last = None;
    for _ in 0..LACON_ITERS {
        let mut z: Vec<T> = x
            .iter()
            .map(|&v| {
                let m = v.modulus();
                if m == 0.0 { T::one() } else { v * T::from_real(1.0 / m) }
            })
            .collect();
        stat.solve_ops += f.solve_column(Trans::ConjTrans, perm_c, perm_r, &mut z, &mut w);
        let j = (0..n)
            .max_by(|&a, &b| z[a].modulus().total_cmp(&z[b].modulus()))
            .unwrap_or(0);
        if last == Some(j) {
            break;
        }
        x.iter_mut().for_each(|v| *v = T::zero());
        x[j] = T::one();
        stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, &mut x, &mut w);
        let next = norm1(&x);
        if next <= est {
            break;
        }
        est = next;
        last = Some(j);
    }

    // Alternating-sign start vector keeps the power iteration from stalling.
    let mut alt: Vec<T> = (0..n)
        .map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            T::from_real(sign * (1.0 + i as f64 / (n - 1) as f64))
        })
        .collect();
    stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, &mut alt, &mut w);
    est.max(2.0 * norm1(&alt) / (3.0 * n as f64))
}

/// Error-free product: `a * b = p + e` exactly.
fn two_product(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    (p, a.mul_add(b, -p))
}

/// Error-free sum: `a + b = s + e` exactly.
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let z = s - a;
    (s, (a - (s - z)) + (b - z))
}

/// Doubled-precision accumulator for one real component.
#[derive(Debug, Clone, Copy, Default)]
struct Dot2 {
    sum: f64,
    err: f64,
}

impl Dot2 {
    fn add(&mut self, v: f64) {
        let (s, e) = two_sum(self.sum, v);
        self.sum = s;
        self.err += e;
    }

    fn add_product(&mut self, a: f64, b: f64) {
        let (p, pe) = two_product(a, b);
        self.add(p);
        self.err += pe;
    }

    fn value(self) -> f64 {
        self.sum + self.err
    }
}

/// `r = b - A x`; with `compensated` the sums are carried in doubled
/// precision.
fn residual<T: Scalar>(a: &CompCol<T>, b: &[T], x: &[T], r: &mut [T], compensated: bool) {
    let n = b.len();
    if !compensated {
        r.copy_from_slice(b);
        for (j, &xj) in x.iter().enumerate() {
            let (rows, vals) = a.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                r[i as usize] -= v * xj;
            }
        }
        return;
    }
    let mut acc: Vec<(Dot2, Dot2)> = b
        .iter()
        .map(|v| {
            let c = v.to_c64();
            (Dot2 { sum: c.re, err: 0.0 }, Dot2 { sum: c.im, err: 0.0 })
        })
        .collect();
    for (j, &xj) in x.iter().enumerate() {
        let xc = xj.to_c64();
        let (rows, vals) = a.column(j);
        for (&i, &v) in rows.iter().zip(vals) {
            let vc = v.to_c64();
            let (re, im) = &mut acc[i as usize];
            re.add_product(-vc.re, xc.re);
            re.add_product(vc.im, xc.im);
            im.add_product(-vc.re, xc.im);
            im.add_product(-vc.im, xc.re);
        }
    }
    for i in 0..n {
        let (re, im) = acc[i];
        r[i] = T::from_c64(C64::new(re.value(), im.value()));
    }
}

/// Componentwise backward error `max_i |r_i| / (|A| |x| + |b|)_i`.
fn backward_error<T: Scalar>(a: &CompCol<T>, b: &[T], x: &[T], r: &[T]) -> f64 {
    let n = b.len();
    let safe1 = (n as f64 + 1.0) * f64::MIN_POSITIVE;
    let safe2 = safe1 / f64::EPSILON;
    let mut denom: Vec<f64> = b.iter().map(|v| v.modulus()).collect();
    for (j, xj) in x.iter().enumerate() {
        let (rows, vals) = a.column(j);
        for (&i, v) in rows.iter().zip(vals) {
            denom[i as usize] += v.modulus() * xj.modulus();
        }
    }
    r.iter()
        .zip(&denom)
        .map(|(ri, &d)| {
            if d > safe2 {
                ri.modulus() / d
            } else {
                (ri.modulus() + safe1) / (d + safe1)
            }
        })
        .fold(0.0, f64::max)
}

fn inf_norm<T: Scalar>(v: &[T]) -> f64 {
    v.iter().map(|x| x.modulus()).fold(0.0, f64::max)
}

/// Solve `A X = B` with optional equilibration, condition estimation and
/// iterative refinement.
///
/// `A` is scaled in place when equilibration applies; row scaling also
/// rescales `B`, so `B` must be [`Rhs::Owned`] in that case. On success `X`
/// holds the solution of the original (unscaled) system.
///
/// Returns `0`, the 1-based column of an exactly zero pivot (no solution),
/// `n + 1` when the matrix is singular to working precision (a solution is
/// still returned), or a negative argument code.
#[allow(clippy::too_many_arguments)]
pub fn gssvx<T: Scalar>(
    options: &LuOptions,
    a: &mut CompCol<T>,
    perm_c: &mut [i32],
    perm_r: &mut [i32],
    factors: &mut Option<LuFactors<T>>,
    b: &mut Rhs<'_, T>,
    x: &mut DenseMut<'_, T>,
    out: &mut ExpertOutput,
    stat: &mut Stat,
) -> i32 {
    if !options.is_valid() {
        return ARG_OPTIONS;
    }
    if !a.is_valid_square() {
        return ARG_A;
    }
    let n = a.ncol() as usize;
    if perm_c.len() < n {
        return ARG_PERM_C;
    }
    if perm_r.len() < n {
        return ARG_PERM_R;
    }
    if !b.is_valid_for(a.nrow()) {
        return ARG_B;
    }
    if !x.is_valid_for(a.nrow()) || x.ncol() != b.ncol() {
        return ARG_X;
    }
    let nrhs = b.ncol() as usize;

    *out = ExpertOutput {
        r: vec![1.0; n],
        c: vec![1.0; n],
        ferr: vec![1.0; nrhs],
        berr: vec![1.0; nrhs],
        ..ExpertOutput::default()
    };

    let mut rowcnd = 1.0;
    let mut colcnd = 1.0;
    if options.equil {
        if let Some(s) = gsequ(a) {
            let equed = laqgs_decision(&s);
            if equed.rows_scaled() && matches!(b, Rhs::Shared(_)) {
                return ARG_B;
            }
            if equed != Equed::None {
                let r = if equed.rows_scaled() { s.r } else { vec![1.0; n] };
                let c = if equed.cols_scaled() { s.c } else { vec![1.0; n] };
                scale_matrix(a, &r, &c);
                if let Rhs::Owned(bm) = b {
                    if equed.rows_scaled() {
                        for j in 0..nrhs {
                            for (v, ri) in bm.column_mut(j).iter_mut().zip(&r) {
                                *v *= T::from_real(*ri);
                            }
                        }
                    }
                }
                out.r = r;
                out.c = c;
                rowcnd = s.rowcnd;
                colcnd = s.colcnd;
                trace!("gssvx: equilibrated {:?} (rowcnd {:.3e}, colcnd {:.3e})", equed, rowcnd, colcnd);
            }
            out.equed = equed;
        }
    }

    get_perm_c(options.col_perm, a, perm_c);
    let f = match gstrf(options, a, perm_c, perm_r, stat) {
        Ok(f) => f,
        Err(info) => return info,
    };
    out.rpg = pivot_growth(a, &f, perm_c);

    if f.info() > 0 {
        out.rcond = 0.0;
        let info = f.info();
        *factors = Some(f);
        return info;
    }

    if options.condition_number {
        let anorm = one_norm(a);
        let ainv = inverse_one_norm(&f, perm_c, perm_r, stat);
        out.rcond = if anorm == 0.0 || ainv == 0.0 { 0.0 } else { 1.0 / (anorm * ainv) };
    }

    let mut w = vec![T::zero(); n];
    let mut r = vec![T::zero(); n];
    let mut d = vec![T::zero(); n];
    let max_steps = options.iter_refine.max_steps();
    let compensated = options.iter_refine == IterRefine::Extra;
    for j in 0..nrhs {
        let bj = b.column(j);
        let xj = x.column_mut(j);
        xj.copy_from_slice(bj);
        stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, xj, &mut w);

        if max_steps == 0 {
            continue;
        }
        let mut last_berr = 3.0;
        let mut steps = 0;
        let berr = loop {
            residual(a, bj, xj, &mut r, compensated);
            let berr = backward_error(a, bj, xj, &r);
            if berr <= f64::EPSILON || 2.0 * berr > last_berr || steps >= max_steps {
                break berr;
            }
            d.copy_from_slice(&r);
            stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, &mut d, &mut w);
            for (xi, di) in xj.iter_mut().zip(&d) {
                *xi += *di;
            }
            last_berr = berr;
            steps += 1;
        };
        stat.refine_steps += steps;

        // Forward error from one more correction against the final residual.
        d.copy_from_slice(&r);
        stat.solve_ops += f.solve_column(Trans::NoTrans, perm_c, perm_r, &mut d, &mut w);
        let xnorm = inf_norm(xj);
        let dnorm = inf_norm(&d);
        out.ferr[j] = if xnorm > 0.0 { dnorm / xnorm } else { dnorm };
        out.berr[j] = berr;
    }
    stat.solves += 1;

    if out.equed.cols_scaled() {
        for j in 0..nrhs {
            for (v, ci) in x.column_mut(j).iter_mut().zip(&out.c) {
                *v *= T::from_real(*ci);
            }
        }
        if max_steps > 0 {
            out.ferr.iter_mut().for_each(|e| *e /= colcnd);
        }
    } else if out.equed.rows_scaled() && max_steps > 0 {
        out.ferr.iter_mut().for_each(|e| *e /= rowcnd);
    }

    let singular = f.replaced_pivots() > 0 || (options.condition_number && out.rcond < f64::EPSILON);
    *factors = Some(f);
    if singular {
        debug!("gssvx: singular to working precision (rcond {:.3e})", out.rcond);
        return n as i32 + 1;
    }
    0
}

fn scale_matrix<T: Scalar>(a: &mut CompCol<T>, r: &[f64], c: &[f64]) {
    let colptr = a.colptr().to_vec();
    let rowind = a.rowind().to_vec();
    let vals = a.nzval_mut();
    for j in 0..c.len() {
        for p in colptr[j] as usize..colptr[j + 1] as usize {
            vals[p] *= T::from_real(r[rowind[p] as usize] * c[j]);
        }
    }
}

fn pivot_growth<T: Scalar>(a: &CompCol<T>, f: &LuFactors<T>, perm_c: &[i32]) -> f64 {
    let n = f.n();
    let Some(q) = inverse_permutation(perm_c, n) else {
        return 1.0;
    };
    let mut rpg = 1.0f64;
    for (k, &col) in q.iter().enumerate() {
        let amax = a.column(col).1.iter().map(|v| v.modulus()).fold(0.0, f64::max);
        let umax = f.u_col_max(k);
        if umax > 0.0 {
            rpg = rpg.min(amax / umax);
        }
    }
    rpg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lu::{ColPerm, DenseRef};

    fn csc(rows: &[&[f64]]) -> CompCol<f64> {
        let n = rows.len();
        let mut colptr = vec![0i32];
        let mut rowind = Vec::new();
        let mut nzval = Vec::new();
        for j in 0..n {
            for (i, row) in rows.iter().enumerate() {
                if row[j] != 0.0 {
                    rowind.push(i as i32);
                    nzval.push(row[j]);
                }
            }
            colptr.push(rowind.len() as i32);
        }
        CompCol::new(n as i32, n as i32, colptr, rowind, nzval)
    }

    struct Run {
        info: i32,
        x: Vec<f64>,
        out: ExpertOutput,
        stat: Stat,
    }

    fn run(a: &CompCol<f64>, b: &[f64], options: &LuOptions) -> Run {
        let n = a.ncol() as usize;
        let nrhs = b.len() / n.max(1);
        let mut a = a.clone();
        let mut perm_c = vec![0; n];
        let mut perm_r = vec![0; n];
        let mut factors = None;
        let mut bdata = b.to_vec();
        let mut x = vec![0.0; b.len()];
        let mut out = ExpertOutput::new();
        let mut stat = Stat::new();
        let info = {
            let mut rhs = Rhs::Owned(DenseMut::new(n as i32, nrhs as i32, n as i32, &mut bdata));
            let mut xm = DenseMut::new(n as i32, nrhs as i32, n as i32, &mut x);
            gssvx(
                options,
                &mut a,
                &mut perm_c,
                &mut perm_r,
                &mut factors,
                &mut rhs,
                &mut xm,
                &mut out,
                &mut stat,
            )
        };
        Run { info, x, out, stat }
    }

    fn refined() -> LuOptions {
        LuOptions {
            iter_refine: IterRefine::Double,
            condition_number: true,
            ..LuOptions::default()
        }
    }

    #[test]
    fn badly_scaled_system() {
        // Rows differ by many orders of magnitude; equilibration rescues it.
        let a = csc(&[&[1e10, 2e10, 0.0], &[1.0, 0.0, 3.0], &[0.0, 1e-8, 1e-8]]);
        // x = [1, 1, 1]
        let b = [3e10, 4.0, 2e-8];
        let res = run(&a, &b, &refined());
        assert_eq!(res.info, 0);
        assert_ne!(res.out.equed, Equed::None);
        for xi in &res.x {
            assert!((xi - 1.0).abs() < 1e-10, "{:?}", res.x);
        }
        assert!(res.out.berr[0] < 1e-14);
        assert!(res.out.ferr[0] < 1e-6);
        assert!(res.out.rcond > 0.0);
    }

    #[test]
    fn condition_estimate_is_sane() {
        // Diagonal: cond_1 = 100 exactly.
        let a = csc(&[&[100.0, 0.0], &[0.0, 1.0]]);
        let options = LuOptions {
            equil: false,
            ..refined()
        };
        let res = run(&a, &[100.0, 1.0], &options);
        assert_eq!(res.info, 0);
        assert!((res.out.rcond - 0.01).abs() < 1e-12);
    }

    #[test]
    fn exact_zero_pivot_stops() {
        let a = csc(&[&[1.0, 1.0], &[2.0, 2.0]]);
        let res = run(&a, &[1.0, 2.0], &refined());
        assert_eq!(res.info, 2);
        assert_eq!(res.out.rcond, 0.0);
    }

    #[test]
    fn replaced_pivot_reports_singular() {
        let a = csc(&[&[1.0, 1.0], &[2.0, 2.0]]);
        let options = LuOptions {
            replace_tiny_pivot: true,
            ..refined()
        };
        let res = run(&a, &[1.0, 2.0], &options);
        assert_eq!(res.info, 3);
        assert!(res.out.rcond.is_finite());
        assert!(res.out.rcond < f64::EPSILON);
        assert!(res.x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extra_refinement_with_several_rhs() {
        let a = csc(&[&[4.0, -1.0, 0.0], &[-1.0, 4.0, -1.0], &[0.0, -1.0, 4.0]]);
        let options = LuOptions {
            iter_refine: IterRefine::Extra,
            col_perm: ColPerm::MmdAtPlusA,
            ..LuOptions::default()
        };
        // Columns: x = [1, 1, 1] and x = [1, 2, 3]
        let b = [3.0, 2.0, 3.0, 2.0, 4.0, 10.0];
        let res = run(&a, &b, &options);
        assert_eq!(res.info, 0);
        let expect = [1.0, 1.0, 1.0, 1.0, 2.0, 3.0];
        for (xi, ei) in res.x.iter().zip(expect) {
            assert!((xi - ei).abs() < 1e-14);
        }
        assert_eq!(res.out.berr.len(), 2);
        assert_eq!(res.stat.factorizations, 1);
    }

    #[test]
    fn shared_rhs_rejected_when_rows_need_scaling() {
        let mut a = csc(&[&[1e12, 0.0], &[0.0, 1e-12]]);
        let b = [1.0, 1.0];
        let mut x = [0.0; 2];
        let mut out = ExpertOutput::new();
        let mut stat = Stat::new();
        let info = gssvx(
            &LuOptions::default(),
            &mut a,
            &mut [0; 2],
            &mut [0; 2],
            &mut None,
            &mut Rhs::Shared(DenseRef::new(2, 1, 2, &b)),
            &mut DenseMut::new(2, 1, 2, &mut x),
            &mut out,
            &mut stat,
        );
        assert_eq!(info, ARG_B);
    }

    #[test]
    fn mismatched_solution_buffer() {
        let mut a = csc(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let b = [1.0, 1.0];
        let mut x = [0.0; 4];
        let info = gssvx(
            &LuOptions::default(),
            &mut a,
            &mut [0; 2],
            &mut [0; 2],
            &mut None,
            &mut Rhs::Shared(DenseRef::new(2, 1, 2, &b)),
            &mut DenseMut::new(2, 2, 2, &mut x),
            &mut ExpertOutput::new(),
            &mut Stat::new(),
        );
        assert_eq!(info, ARG_X);
    }

    #[test]
    fn compensated_residual_beats_naive() {
        // 1e16 + 1 - 1e16 loses the 1 in plain arithmetic.
        let a = CompCol::new(1, 3, vec![0, 1, 2, 3], vec![0, 0, 0], vec![1e16, 1.0, -1e16]);
        let x = [1.0, 1.0, 1.0];
        let mut r = [0.0];
        residual(&a, &[0.0], &x, &mut r, true);
        assert_eq!(r[0], -1.0);
    }
}
