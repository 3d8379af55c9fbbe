//! Left-looking sparse LU (Gilbert-Peierls) and triangular solves.

use log::trace;

use krylo_core::Scalar;

use super::{
    ARG_A, ARG_B, ARG_OPTIONS, ARG_PERM_C, ARG_PERM_R, CompCol, DenseMut, LuOptions, Stat, Trans, alloc_failure,
    get_perm_c,
};

/// `L` and `U` factors of `Pr A Pc`, both indexed in pivot order.
///
/// `L` is unit lower triangular with the unit diagonal stored first in each
/// column; `U` stores its diagonal last in each column.
#[derive(Debug, Clone)]
pub struct LuFactors<T> {
    n: usize,
    l_colptr: Vec<usize>,
    l_rowind: Vec<usize>,
    l_val: Vec<T>,
    u_colptr: Vec<usize>,
    u_rowind: Vec<usize>,
    u_val: Vec<T>,
    info: i32,
    replaced_pivots: usize,
}

impl<T: Scalar> LuFactors<T> {
    pub fn n(&self) -> usize {
        self.n
    }

    /// `0`, or the 1-based column of the first exactly zero pivot.
    pub fn info(&self) -> i32 {
        self.info
    }

    /// Pivots replaced under [`LuOptions::replace_tiny_pivot`].
    pub fn replaced_pivots(&self) -> usize {
        self.replaced_pivots
    }

    pub fn l_nnz(&self) -> usize {
        self.l_val.len()
    }

    pub fn u_nnz(&self) -> usize {
        self.u_val.len()
    }

    /// Largest magnitude in column `j` of `U`.
    pub(crate) fn u_col_max(&self, j: usize) -> f64 {
        self.u_val[self.u_colptr[j]..self.u_colptr[j + 1]]
            .iter()
            .map(|v| v.modulus())
            .fold(0.0, f64::max)
    }

    fn u_diag(&self, j: usize) -> T {
        self.u_val[self.u_colptr[j + 1] - 1]
    }

    /// Solve in place on one column. `w` is scratch of length `n`.
    pub(crate) fn solve_column(&self, trans: Trans, perm_c: &[i32], perm_r: &[i32], b: &mut [T], w: &mut [T]) -> u64 {
        let n = self.n;
        let mut ops = 0u64;
        match trans {
            Trans::NoTrans => {
                for i in 0..n {
                    w[perm_r[i] as usize] = b[i];
                }
                for j in 0..n {
                    let xj = w[j];
                    for p in self.l_colptr[j] + 1..self.l_colptr[j + 1] {
                        w[self.l_rowind[p]] -= self.l_val[p] * xj;
                    }
                    ops += 2 * (self.l_colptr[j + 1] - self.l_colptr[j] - 1) as u64;
                }
                for j in (0..n).rev() {
                    w[j] /= self.u_diag(j);
                    let xj = w[j];
                    for p in self.u_colptr[j]..self.u_colptr[j + 1] - 1 {
                        w[self.u_rowind[p]] -= self.u_val[p] * xj;
                    }
                    ops += 2 * (self.u_colptr[j + 1] - self.u_colptr[j]) as u64;
                }
                for j in 0..n {
                    b[j] = w[perm_c[j] as usize];
                }
            }
            Trans::Trans | Trans::ConjTrans => {
                let op = |v: T| if trans == Trans::ConjTrans { v.conjugate() } else { v };
                for j in 0..n {
                    w[perm_c[j] as usize] = b[j];
                }
                for j in 0..n {
                    let mut s = w[j];
                    for p in self.u_colptr[j]..self.u_colptr[j + 1] - 1 {
                        s -= op(self.u_val[p]) * w[self.u_rowind[p]];
                    }
                    w[j] = s / op(self.u_diag(j));
                    ops += 2 * (self.u_colptr[j + 1] - self.u_colptr[j]) as u64;
                }
                for j in (0..n).rev() {
                    let mut s = w[j];
                    for p in self.l_colptr[j] + 1..self.l_colptr[j + 1] {
                        s -= op(self.l_val[p]) * w[self.l_rowind[p]];
                    }
                    w[j] = s;
                    ops += 2 * (self.l_colptr[j + 1] - self.l_colptr[j] - 1) as u64;
                }
                for i in 0..n {
                    b[i] = w[perm_r[i] as usize];
                }
            }
        }
        ops
    }
}

/// Depth-first reach of the nonzero rows of one column through the graph
/// of `L`. Fills `out` with the reached rows in topological order.
struct Reach {
    marked: Vec<bool>,
    stack: Vec<(usize, usize)>,
    out: Vec<usize>,
}

impl Reach {
    fn new(n: usize) -> Self {
        Self {
            marked: vec![false; n],
            stack: Vec::new(),
            out: Vec::with_capacity(n),
        }
    }

    fn compute(&mut self, rows: &[i32], pinv: &[Option<usize>], l_colptr: &[usize], l_rowind: &[usize]) {
        self.out.clear();
        let span = |j: usize| match pinv[j] {
            Some(col) => (l_colptr[col], l_colptr[col + 1]),
            None => (0, 0),
        };
        for &start in rows {
            let start = start as usize;
            if self.marked[start] {
                continue;
            }
            self.marked[start] = true;
            self.stack.push((start, span(start).0));
            while let Some(&mut (j, ref mut pos)) = self.stack.last_mut() {
                let end = span(j).1;
                let mut next = None;
                while *pos < end {
                    let i = l_rowind[*pos];
                    *pos += 1;
                    if !self.marked[i] {
                        next = Some(i);
                        break;
                    }
                }
                match next {
                    Some(i) => {
                        self.marked[i] = true;
                        self.stack.push((i, span(i).0));
                    }
                    None => {
                        self.stack.pop();
                        self.out.push(j);
                    }
                }
            }
        }
        self.out.reverse();
        for &j in &self.out {
            self.marked[j] = false;
        }
    }
}

fn reserve<V>(v: &mut Vec<V>, additional: usize, n: usize) -> Result<(), i32> {
    v.try_reserve(additional)
        .map_err(|_| alloc_failure(n, additional.saturating_mul(std::mem::size_of::<V>())))
}

/// Factor `Pr A Pc = L U` for the column order given by `perm_c`
/// (`perm_c[j]` is the position of column `j`). On return `perm_r[i]` is the
/// pivot position of row `i`.
///
/// An exactly zero pivot does not stop the factorization: it is recorded in
/// [`LuFactors::info`] unless `replace_tiny_pivot` is set. Argument errors
/// and allocation failures are returned as `Err(info)`.
pub fn gstrf<T: Scalar>(
    options: &LuOptions,
    a: &CompCol<T>,
    perm_c: &[i32],
    perm_r: &mut [i32],
    stat: &mut Stat,
) -> Result<LuFactors<T>, i32> {
    if !options.is_valid() {
        return Err(ARG_OPTIONS);
    }
    if !a.is_valid_square() {
        return Err(ARG_A);
    }
    let n = a.ncol() as usize;
    let q = inverse_permutation(perm_c, n).ok_or(ARG_PERM_C)?;
    if perm_r.len() < n {
        return Err(ARG_PERM_R);
    }

    let anorm = a.nzval().iter().map(|v| v.modulus()).fold(0.0, f64::max);
    let tiny = f64::EPSILON * anorm;
    let thresh = options.effective_thresh();

    let mut f = LuFactors {
        n,
        l_colptr: Vec::with_capacity(n + 1),
        l_rowind: Vec::new(),
        l_val: Vec::new(),
        u_colptr: Vec::with_capacity(n + 1),
        u_rowind: Vec::new(),
        u_val: Vec::new(),
        info: 0,
        replaced_pivots: 0,
    };
    f.l_colptr.push(0);
    f.u_colptr.push(0);
    reserve(&mut f.l_rowind, a.nnz(), n)?;
    reserve(&mut f.l_val, a.nnz(), n)?;
    reserve(&mut f.u_rowind, a.nnz(), n)?;
    reserve(&mut f.u_val, a.nnz(), n)?;

    let mut pinv: Vec<Option<usize>> = vec![None; n];
    let mut x = vec![T::zero(); n];
    let mut reach = Reach::new(n);

    for k in 0..n {
        let col = q[k];
        let (rows, vals) = a.column(col);
        reach.compute(rows, &pinv, &f.l_colptr, &f.l_rowind);

        for (&r, &v) in rows.iter().zip(vals) {
            x[r as usize] = v;
        }
        for &j in &reach.out {
            let Some(jcol) = pinv[j] else { continue };
            let xj = x[j];
            for p in f.l_colptr[jcol] + 1..f.l_colptr[jcol + 1] {
                x[f.l_rowind[p]] -= f.l_val[p] * xj;
            }
            stat.factor_ops += 2 * (f.l_colptr[jcol + 1] - f.l_colptr[jcol] - 1) as u64;
        }

        let len = reach.out.len() + 1;
        reserve(&mut f.l_rowind, len, n)?;
        reserve(&mut f.l_val, len, n)?;
        reserve(&mut f.u_rowind, len, n)?;
        reserve(&mut f.u_val, len, n)?;

        // U part, and the largest candidate among unpivoted rows.
        let mut best: Option<(usize, f64)> = None;
        for &i in &reach.out {
            match pinv[i] {
                Some(pos) => {
                    f.u_rowind.push(pos);
                    f.u_val.push(x[i]);
                }
                None => {
                    let t = x[i].modulus();
                    if best.is_none_or(|(_, m)| t > m) {
                        best = Some((i, t));
                    }
                }
            }
        }

        let mut ipiv = best.map(|(i, _)| i);
        let amax = best.map_or(0.0, |(_, m)| m);
        if amax > 0.0 && pinv[col].is_none() {
            let d = x[col].modulus();
            if d > 0.0 && d >= thresh * amax {
                ipiv = Some(col);
            }
        }

        let mut pivot = ipiv.map_or(T::zero(), |i| x[i]);
        if pivot.modulus() <= tiny || pivot == T::zero() {
            // Structurally or numerically zero column: still assign a row so
            // the remaining columns can be processed.
            let row = ipiv
                .or_else(|| pinv[col].is_none().then_some(col))
                .or_else(|| pinv.iter().position(|p| p.is_none()))
                .ok_or(ARG_A)?;
            ipiv = Some(row);
            if options.replace_tiny_pivot {
                let magnitude = if tiny > 0.0 { tiny } else { f64::EPSILON };
                pivot = if pivot == T::zero() {
                    T::from_real(magnitude)
                } else {
                    pivot * T::from_real(magnitude / pivot.modulus())
                };
                f.replaced_pivots += 1;
                stat.tiny_pivots += 1;
            } else if pivot == T::zero() && f.info == 0 {
                f.info = k as i32 + 1;
                trace!("gstrf: zero pivot in column {}", k + 1);
            }
        }
        let ipiv = ipiv.ok_or(ARG_A)?;

        pinv[ipiv] = Some(k);
        f.l_rowind.push(ipiv);
        f.l_val.push(T::one());
        if pivot != T::zero() {
            for &i in &reach.out {
                if pinv[i].is_none() {
                    f.l_rowind.push(i);
                    f.l_val.push(x[i] / pivot);
                }
            }
            stat.factor_ops += reach.out.len() as u64;
        }
        f.u_rowind.push(k);
        f.u_val.push(pivot);
        f.l_colptr.push(f.l_rowind.len());
        f.u_colptr.push(f.u_rowind.len());

        for &i in &reach.out {
            x[i] = T::zero();
        }
        x[ipiv] = T::zero();
    }

    for (i, p) in pinv.iter().enumerate() {
        // Every row is pivoted exactly once in a square factorization.
        perm_r[i] = p.map_or(i as i32, |k| k as i32);
    }
    for r in f.l_rowind.iter_mut() {
        if let Some(k) = pinv[*r] {
            *r = k;
        }
    }
    stat.factorizations += 1;
    trace!(
        "gstrf: n={} nnz(A)={} nnz(L)={} nnz(U)={} info={}",
        n,
        a.nnz(),
        f.l_nnz(),
        f.u_nnz(),
        f.info
    );
    Ok(f)
}

/// `q[k]` = column at step `k`, or `None` if `perm_c` is not a permutation.
pub(crate) fn inverse_permutation(perm: &[i32], n: usize) -> Option<Vec<usize>> {
    if perm.len() < n {
        return None;
    }
    let mut q = vec![usize::MAX; n];
    for (j, &p) in perm[..n].iter().enumerate() {
        let p = usize::try_from(p).ok().filter(|&p| p < n)?;
        if q[p] != usize::MAX {
            return None;
        }
        q[p] = j;
    }
    Some(q)
}

/// Solve `op(A) X = B` in place using factors from [`gstrf`].
pub fn gstrs<T: Scalar>(
    trans: Trans,
    factors: &LuFactors<T>,
    perm_c: &[i32],
    perm_r: &[i32],
    b: &mut DenseMut<'_, T>,
    stat: &mut Stat,
) -> i32 {
    let n = factors.n;
    if perm_c.len() < n {
        return ARG_PERM_C;
    }
    if perm_r.len() < n {
        return ARG_PERM_R;
    }
    let Ok(n32) = i32::try_from(n) else {
        return ARG_A;
    };
    if !b.is_valid_for(n32) {
        return ARG_B;
    }
    let mut w = vec![T::zero(); n];
    for j in 0..b.ncol() as usize {
        stat.solve_ops += factors.solve_column(trans, perm_c, perm_r, b.column_mut(j), &mut w);
    }
    stat.solves += 1;
    0
}

/// Factor `A` and solve `A X = B`, overwriting `B` with `X`.
///
/// `perm_c` is filled from `options.col_perm`; `factors` receives `L` and
/// `U` whenever the factorization completes.
pub fn gssv<T: Scalar>(
    options: &LuOptions,
    a: &CompCol<T>,
    perm_c: &mut [i32],
    perm_r: &mut [i32],
    factors: &mut Option<LuFactors<T>>,
    b: &mut DenseMut<'_, T>,
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

    get_perm_c(options.col_perm, a, perm_c);
    let f = match gstrf(options, a, perm_c, perm_r, stat) {
        Ok(f) => f,
        Err(info) => return info,
    };
    let info = f.info();
    if info == 0 {
        gstrs(Trans::NoTrans, &f, perm_c, perm_r, b, stat);
    }
    *factors = Some(f);
    info
}
