//! Implicitly restarted Arnoldi iteration with reverse communication.
//!
//! The engine never touches the operator. Each call to
//! [`ArnoldiEngine::iterate`] either asks the caller to apply the operator to
//! the slice of [`Workspace::workd`] starting at `ipntr[0]` and write the
//! result at `ipntr[1]` (`ido == -1` or `ido == 1`), or reports that it is
//! done (`ido == 99`) with a status in [`Workspace::info`].
//!
//! Algorithm:
//! 1. Build an `ncv`-step Arnoldi factorization `OP V = V H + f e^H`
//!    (classical Gram-Schmidt with DGKS re-orthogonalization).
//! 2. Compute Ritz pairs of the small projected matrix `H`.
//! 3. Accept when `|f| |s_last| <= tol * max(eps^(2/3), |theta|)` holds for
//!    the `nev` wanted values.
//! 4. Otherwise restart from a `k`-step factorization and extend it again.
//!    Hermitian problems keep the wanted Ritz vectors themselves (thick
//!    restart). General problems apply the unwanted Ritz values as exact
//!    shifts.
//!
//! Real operators use double shifts for complex conjugate Ritz values so the
//! basis stays real.

mod extract;
mod restart;
mod ritz;

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use krylo_core::{C64, Scalar};

use ritz::RitzState;

pub use extract::{ComplexPairs, HermitianPairs, PackedRealPairs};

/// `ido` value expected on the first call.
pub const IDO_FIRST: i32 = 0;
/// First operator request of a run.
pub const IDO_APPLY_FIRST: i32 = -1;
/// Subsequent operator requests.
pub const IDO_APPLY: i32 = 1;
/// Iteration finished; inspect [`Workspace::info`].
pub const IDO_DONE: i32 = 99;

/// Engine status codes reported through [`Workspace::info`].
pub mod status {
    /// All wanted Ritz values converged.
    pub const CONVERGED: i32 = 0;
    /// Maximum number of restart cycles reached.
    pub const MAX_ITERATIONS: i32 = 1;
    /// `n` must be positive and match the workspace.
    pub const BAD_N: i32 = -1;
    /// `nev` out of range for the problem kind.
    pub const BAD_NEV: i32 = -2;
    /// `ncv` out of range for the problem kind.
    pub const BAD_NCV: i32 = -3;
    /// `max_iter` must be positive.
    pub const BAD_MAX_ITER: i32 = -4;
    /// The start vector is zero.
    pub const ZERO_START: i32 = -9;
    /// No Arnoldi factorization could be built (or the protocol was misused).
    pub const NO_FACTORIZATION: i32 = -9999;
}

/// DGKS acceptance ratio between successive orthogonalization passes.
const REORTH_RATIO: f64 = 0.717;
const MAX_ORTH_PASSES: usize = 3;
const DEFAULT_SEED: u64 = 0x6b72_796c_6f5f_7631;

/// Which Ritz values are wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    LargestMagnitude,
    SmallestMagnitude,
    LargestAlgebraic,
    SmallestAlgebraic,
    LargestReal,
    SmallestReal,
    LargestImaginary,
    SmallestImaginary,
}

/// Hermitian problems use a symmetric tridiagonal projection; general
/// problems keep the full upper Hessenberg matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    Hermitian,
    General,
}

/// Spectral transformation applied by the caller's operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// `OP = A`
    Regular,
    /// `OP = (A - sigma I)^-1`; eigenvalues are recovered as `sigma + 1/theta`.
    ShiftInvert { sigma: C64 },
}

/// Problem parameters for one engine run.
#[derive(Debug, Clone, Copy)]
pub struct ArnoldiParams {
    pub n: usize,
    pub nev: usize,
    pub ncv: usize,
    pub which: Which,
    pub problem: Problem,
    pub mode: Mode,
    /// Relative accuracy; values at or below machine epsilon use epsilon.
    pub tol: f64,
    /// Maximum number of restart cycles.
    pub max_iter: usize,
    /// Seed for the start vector and breakdown recovery.
    pub seed: u64,
}

impl ArnoldiParams {
    pub fn new(n: usize, nev: usize, ncv: usize, which: Which, problem: Problem) -> Self {
        Self {
            n,
            nev,
            ncv,
            which,
            problem,
            mode: Mode::Regular,
            tol: 0.0,
            max_iter: 1000,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check parameter ranges, returning the engine status code on failure.
    pub fn validate(&self) -> Result<(), i32> {
        if self.n == 0 {
            return Err(status::BAD_N);
        }
        let (max_nev, min_gap) = match self.problem {
            Problem::Hermitian => (self.n - 1, 1),
            Problem::General => (self.n.saturating_sub(2), 2),
        };
        if self.nev == 0 || self.nev > max_nev {
            return Err(status::BAD_NEV);
        }
        if self.ncv < self.nev + min_gap || self.ncv > self.n {
            return Err(status::BAD_NCV);
        }
        if self.max_iter == 0 {
            return Err(status::BAD_MAX_ITER);
        }
        Ok(())
    }

    fn effective_tol(&self) -> f64 {
        self.tol.max(f64::EPSILON)
    }
}

/// Reverse-communication workspace shared between engine and caller.
#[derive(Debug, Clone)]
pub struct Workspace<T> {
    n: usize,
    /// Work array of length `3n` holding operator input and output.
    pub workd: Vec<T>,
    /// Offsets into `workd`: `[input, output]`.
    pub ipntr: [usize; 2],
    /// Status of the last completed run.
    pub info: i32,
}

impl<T: Scalar> Workspace<T> {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            workd: vec![T::zero(); 3 * n],
            ipntr: [0, n],
            info: 0,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Split `workd` into the operator input and output slices.
    pub fn operator_views(&mut self) -> (&[T], &mut [T]) {
        let n = self.n;
        let [xi, yi] = self.ipntr;
        if xi < yi {
            let (lo, hi) = self.workd.split_at_mut(yi);
            (&lo[xi..xi + n], &mut hi[..n])
        } else {
            let (lo, hi) = self.workd.split_at_mut(xi);
            (&hi[..n], &mut lo[yi..yi + n])
        }
    }

    fn output(&self) -> &[T] {
        &self.workd[self.ipntr[1]..self.ipntr[1] + self.n]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    /// Waiting for `OP * v_j`.
    Expanding { j: usize },
    Done,
}

enum Step {
    Request(usize),
    Finish(i32),
}

/// Resumable implicitly restarted Arnoldi engine.
pub struct ArnoldiEngine<T: Scalar> {
    params: ArnoldiParams,
    /// Orthonormal basis, `n x ncv`.
    v: DMatrix<T>,
    /// Projected matrix, `ncv x ncv`.
    h: DMatrix<T>,
    /// Residual of the full factorization.
    resid: DVector<T>,
    stage: Stage,
    first_request: bool,
    slot: usize,
    restarts: usize,
    op_applications: usize,
    info: i32,
    ritz: Option<RitzState>,
    rng: StdRng,
}

impl<T: Scalar> ArnoldiEngine<T> {
    pub fn new(params: ArnoldiParams) -> Self {
        let (n, m) = (params.n, params.ncv);
        Self {
            v: DMatrix::zeros(n, m),
            h: DMatrix::zeros(m, m),
            resid: DVector::zeros(n),
            stage: Stage::Idle,
            first_request: true,
            slot: 0,
            restarts: 0,
            op_applications: 0,
            info: 0,
            ritz: None,
            rng: StdRng::seed_from_u64(params.seed),
            params,
        }
    }

    pub fn params(&self) -> &ArnoldiParams {
        &self.params
    }

    /// Status of the finished run (meaningful once `ido == 99`).
    pub fn info(&self) -> i32 {
        self.info
    }

    /// Restart cycles performed so far.
    pub fn iterations(&self) -> usize {
        self.restarts
    }

    pub fn op_applications(&self) -> usize {
        self.op_applications
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Number of wanted Ritz values that met the tolerance in the last cycle.
    pub fn nconv(&self) -> usize {
        self.ritz.as_ref().map_or(0, |r| r.nconv)
    }

    /// Advance the iteration by one reverse-communication step.
    pub fn iterate(&mut self, ido: &mut i32, ws: &mut Workspace<T>) {
        let step = match (*ido, self.stage) {
            (IDO_FIRST, Stage::Idle) => self.start(ws),
            (IDO_APPLY_FIRST | IDO_APPLY, Stage::Expanding { j }) => self.absorb(j, ws),
            _ => Step::Finish(status::NO_FACTORIZATION),
        };
        match step {
            Step::Request(j) => {
                self.post_request(j, ws);
                *ido = if self.first_request { IDO_APPLY_FIRST } else { IDO_APPLY };
                self.first_request = false;
            }
            Step::Finish(info) => {
                self.stage = Stage::Done;
                self.info = info;
                ws.info = info;
                *ido = IDO_DONE;
            }
        }
    }

    fn start(&mut self, ws: &Workspace<T>) -> Step {
        if let Err(code) = self.params.validate() {
            return Step::Finish(code);
        }
        if ws.n() != self.params.n {
            return Step::Finish(status::BAD_N);
        }

        let v0 = DVector::from_fn(self.params.n, |_, _| self.random_scalar());
        let norm = v0.norm();
        if norm == 0.0 {
            return Step::Finish(status::ZERO_START);
        }
        self.v.set_column(0, &(v0 / T::from_real(norm)));
        debug!(
            "arnoldi: n={} nev={} ncv={} which={:?} {:?} ({})",
            self.params.n,
            self.params.nev,
            self.params.ncv,
            self.params.which,
            self.params.problem,
            T::kind_name()
        );
        Step::Request(0)
    }

    fn absorb(&mut self, j: usize, ws: &Workspace<T>) -> Step {
        self.op_applications += 1;
        let w = DVector::from_column_slice(ws.output());
        if let Err(code) = self.extend(j, w) {
            return Step::Finish(code);
        }
        if j + 1 < self.params.ncv {
            return Step::Request(j + 1);
        }

        self.restarts += 1;
        let state = RitzState::compute(&self.h, self.resid.norm(), &self.params);
        let nconv = state.nconv;
        trace!(
            "arnoldi: cycle {} nconv={}/{} |f|={:.3e}",
            self.restarts,
            nconv,
            self.params.nev,
            state.rnorm
        );
        if nconv >= self.params.nev {
            debug!("arnoldi: converged after {} cycles", self.restarts);
            self.ritz = Some(state);
            return Step::Finish(status::CONVERGED);
        }
        if self.restarts >= self.params.max_iter {
            debug!("arnoldi: stopped at max_iter={} with nconv={}", self.params.max_iter, nconv);
            self.ritz = Some(state);
            return Step::Finish(status::MAX_ITERATIONS);
        }

        let k = state.restart_size(&self.params);
        let restarted = match self.params.problem {
            Problem::Hermitian => self.thick_restart(k, &state),
            Problem::General => self.compress(k, &state.unwanted(k)),
        };
        self.ritz = Some(state);
        match restarted {
            Ok(()) => Step::Request(k),
            Err(code) => Step::Finish(code),
        }
    }

    /// Copy `v_j` into a fresh input slot.
    fn post_request(&mut self, j: usize, ws: &mut Workspace<T>) {
        let n = self.params.n;
        self.slot = (self.slot + 1) % 3;
        ws.ipntr = [self.slot * n, ((self.slot + 1) % 3) * n];
        let [xi, yi] = ws.ipntr;
        for (dst, src) in ws.workd[xi..xi + n].iter_mut().zip(self.v.column(j).iter()) {
            *dst = *src;
        }
        ws.workd[yi..yi + n].fill(T::zero());
        self.stage = Stage::Expanding { j };
    }

    /// Orthogonalize `w = OP v_j` against `V[:, 0..=j]` and store the new
    /// column of `H`, the next basis vector or the residual.
    fn extend(&mut self, j: usize, mut w: DVector<T>) -> Result<(), i32> {
        let cols = j + 1;
        let mut hcol = DVector::zeros(cols);
        let mut prev = w.norm();
        let mut beta = prev;
        let mut accepted = false;
        for _ in 0..MAX_ORTH_PASSES {
            let c = self.v.columns(0, cols).ad_mul(&w);
            w -= self.v.columns(0, cols) * &c;
            hcol += c;
            beta = w.norm();
            if beta > 0.0 && beta >= REORTH_RATIO * prev {
                accepted = true;
                break;
            }
            prev = beta;
        }
        self.h.view_mut((0, j), (cols, 1)).copy_from(&hcol);

        if j + 1 == self.params.ncv {
            self.resid = if accepted { w } else { DVector::zeros(self.params.n) };
            return Ok(());
        }
        if accepted {
            self.h[(j + 1, j)] = T::from_real(beta);
            self.v.set_column(j + 1, &(w / T::from_real(beta)));
        } else {
            trace!("arnoldi: invariant subspace at step {}", j + 1);
            self.h[(j + 1, j)] = T::zero();
            let fresh = self.orthogonal_vector(j + 1)?;
            self.v.set_column(j + 1, &fresh);
        }
        Ok(())
    }

    /// Keep the `k` leading wanted Ritz vectors as the new basis.
    ///
    /// With `H S = S Theta` the relation `OP V = V H + f e_m^H` becomes
    /// `OP (V S_k) = (V S_k) Theta_k + f s_m^H`, so the projection restarts as
    /// `diag(Theta_k)` with the coupling `|f| s_m` in row `k` and
    /// `v_k = f / |f|`.
    fn thick_restart(&mut self, k: usize, ritz: &RitzState) -> Result<(), i32> {
        let m = self.params.ncv;
        let keep = &ritz.order[..k];
        let s = DMatrix::from_fn(m, k, |r, c| T::from_c64(ritz.vectors[(r, keep[c])]));
        let vs = &self.v * &s;
        let beta = self.resid.norm();
        let small = f64::EPSILON * self.h.norm();

        self.v.columns_mut(0, k).copy_from(&vs);
        self.h.fill(T::zero());
        for (c, &i) in keep.iter().enumerate() {
            self.h[(c, c)] = T::from_real(ritz.values[i].re);
        }

        if beta > small {
            for c in 0..k {
                self.h[(k, c)] = s[(m - 1, c)] * T::from_real(beta);
            }
            let next = &self.resid / T::from_real(beta);
            self.v.set_column(k, &next);
        } else {
            let fresh = self.orthogonal_vector(k)?;
            self.v.set_column(k, &fresh);
        }
        Ok(())
    }

    /// Apply the unwanted Ritz values as shifts and keep a `k`-step
    /// factorization.
    fn compress(&mut self, k: usize, shifts: &[C64]) -> Result<(), i32> {
        let m = self.params.ncv;
        let (hp, q) = restart::apply_shifts(&self.h, shifts);

        let vq = &self.v * &q;
        let f = vq.column(k) * hp[(k, k - 1)] + &self.resid * q[(m - 1, k - 1)];

        self.v.columns_mut(0, k).copy_from(&vq.columns(0, k));
        self.h.fill(T::zero());
        self.h.view_mut((0, 0), (k, k)).copy_from(&hp.view((0, 0), (k, k)));

        let beta = f.norm();
        if beta > f64::EPSILON * hp.norm() {
            self.h[(k, k - 1)] = T::from_real(beta);
            self.v.set_column(k, &(f / T::from_real(beta)));
        } else {
            let fresh = self.orthogonal_vector(k)?;
            self.v.set_column(k, &fresh);
        }
        Ok(())
    }

    /// A random unit vector orthogonal to the first `cols` basis vectors.
    fn orthogonal_vector(&mut self, cols: usize) -> Result<DVector<T>, i32> {
        for _ in 0..3 {
            let mut w = DVector::from_fn(self.params.n, |_, _| self.random_scalar());
            for _ in 0..2 {
                let c = self.v.columns(0, cols).ad_mul(&w);
                w -= self.v.columns(0, cols) * c;
            }
            let norm = w.norm();
            if norm > f64::EPSILON.sqrt() {
                return Ok(w / T::from_real(norm));
            }
        }
        Err(status::NO_FACTORIZATION)
    }

    fn random_scalar(&mut self) -> T {
        let re = self.rng.random_range(-1.0..1.0);
        let im = self.rng.random_range(-1.0..1.0);
        T::from_c64(C64::new(re, im))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_dense<T: Scalar>(a: &DMatrix<T>, engine: &mut ArnoldiEngine<T>) -> i32 {
        let mut ws = Workspace::new(a.nrows());
        let mut ido = IDO_FIRST;
        loop {
            engine.iterate(&mut ido, &mut ws);
            if ido == IDO_DONE {
                return ws.info;
            }
            let (x, y) = ws.operator_views();
            let ax = a * DVector::from_column_slice(x);
            y.copy_from_slice(ax.as_slice());
        }
    }

    fn tridiag(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                2.0
            } else if i.abs_diff(j) == 1 {
                -1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn validate_ranges() {
        let p = ArnoldiParams::new(4, 2, 4, Which::LargestMagnitude, Problem::Hermitian);
        assert!(p.validate().is_ok());
        let p = ArnoldiParams::new(4, 4, 4, Which::LargestMagnitude, Problem::Hermitian);
        assert_eq!(p.validate(), Err(status::BAD_NEV));
        let p = ArnoldiParams::new(4, 2, 3, Which::LargestMagnitude, Problem::General);
        assert_eq!(p.validate(), Err(status::BAD_NCV));
        let p = ArnoldiParams::new(0, 1, 1, Which::LargestMagnitude, Problem::General);
        assert_eq!(p.validate(), Err(status::BAD_N));
        let p = ArnoldiParams::new(4, 1, 3, Which::LargestMagnitude, Problem::General).with_max_iter(0);
        assert_eq!(p.validate(), Err(status::BAD_MAX_ITER));
    }

    #[test]
    fn bad_params_finish_immediately() {
        let mut engine = ArnoldiEngine::<f64>::new(ArnoldiParams::new(
            4,
            0,
            4,
            Which::LargestMagnitude,
            Problem::Hermitian,
        ));
        let mut ws = Workspace::new(4);
        let mut ido = IDO_FIRST;
        engine.iterate(&mut ido, &mut ws);
        assert_eq!(ido, IDO_DONE);
        assert_eq!(ws.info, status::BAD_NEV);
    }

    #[test]
    fn protocol_sequence() {
        let a = tridiag(6);
        let mut engine = ArnoldiEngine::new(ArnoldiParams::new(
            6,
            2,
            6,
            Which::LargestAlgebraic,
            Problem::Hermitian,
        ));
        let mut ws = Workspace::new(6);
        let mut ido = IDO_FIRST;
        engine.iterate(&mut ido, &mut ws);
        assert_eq!(ido, IDO_APPLY_FIRST);
        let mut requests = 1;
        loop {
            let (x, y) = ws.operator_views();
            let ax = &a * DVector::from_column_slice(x);
            y.copy_from_slice(ax.as_slice());
            engine.iterate(&mut ido, &mut ws);
            if ido == IDO_DONE {
                break;
            }
            assert_eq!(ido, IDO_APPLY);
            requests += 1;
        }
        assert_eq!(ws.info, status::CONVERGED);
        assert_eq!(requests, engine.op_applications());
    }

    #[test]
    fn misuse_reports_error() {
        let mut engine = ArnoldiEngine::<f64>::new(ArnoldiParams::new(
            4,
            1,
            3,
            Which::LargestMagnitude,
            Problem::Hermitian,
        ));
        let mut ws = Workspace::new(4);
        let mut ido = IDO_APPLY;
        engine.iterate(&mut ido, &mut ws);
        assert_eq!(ido, IDO_DONE);
        assert_eq!(ws.info, status::NO_FACTORIZATION);
    }

    #[test]
    fn restarts_on_larger_problem() {
        let n = 60;
        let a = tridiag(n);
        let params = ArnoldiParams::new(n, 3, 10, Which::LargestAlgebraic, Problem::Hermitian).with_tolerance(1e-10);
        let mut engine = ArnoldiEngine::new(params);
        let info = drive_dense(&a, &mut engine);
        assert_eq!(info, status::CONVERGED);
        assert!(engine.iterations() > 1, "expected at least one restart");

        let pairs = engine.hermitian_pairs(false).unwrap();
        let pi = std::f64::consts::PI;
        for (idx, &value) in pairs.values.iter().enumerate() {
            let j = (n - idx) as f64;
            let exact = 2.0 - 2.0 * (j * pi / (n as f64 + 1.0)).cos();
            assert!((value - exact).abs() < 1e-8, "value {idx}: {value} vs {exact}");
        }
    }

    /// Random sparse symmetric matrix with an indefinite spectrum.
    fn random_symmetric(n: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut a = DMatrix::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = rng.random_range(-2.0..2.0);
            for j in i + 1..n {
                if rng.random_bool(0.1) {
                    let v = rng.random_range(-1.0..1.0);
                    a[(i, j)] = v;
                    a[(j, i)] = v;
                }
            }
        }
        a
    }

    #[test]
    fn shift_invert_vectors_on_indefinite_problems() {
        let (n, nev, sigma) = (60, 6, 0.1);
        for seed in [9, 12, 16, 20, 22, 25] {
            let a = random_symmetric(n, seed);
            let op = (&a - DMatrix::identity(n, n) * sigma).try_inverse().unwrap();
            let params = ArnoldiParams::new(n, nev, 20, Which::LargestMagnitude, Problem::Hermitian)
                .with_mode(Mode::ShiftInvert { sigma: C64::new(sigma, 0.0) });
            let mut engine = ArnoldiEngine::new(params);
            assert_eq!(drive_dense(&op, &mut engine), status::CONVERGED, "seed {seed}");

            let pairs = engine.hermitian_pairs(true).unwrap();
            assert_eq!(pairs.values.len(), nev, "seed {seed}");
            for (j, &lambda) in pairs.values.iter().enumerate() {
                let v = pairs.vectors.column(j).into_owned();
                let theta = 1.0 / (lambda - sigma);
                let op_resid = (&op * &v - &v * theta).norm() / (theta.abs() * v.norm());
                assert!(op_resid < 1e-8, "seed {seed}: theta {theta} residual {op_resid}");
                let a_resid = (&a * &v - &v * lambda).norm() / v.norm();
                assert!(a_resid < 1e-6, "seed {seed}: lambda {lambda} residual {a_resid}");
            }
        }
    }

    #[test]
    fn thick_restart_keeps_basis_orthonormal() {
        let n = 80;
        let a = random_symmetric(n, 3);
        let params = ArnoldiParams::new(n, 4, 12, Which::SmallestAlgebraic, Problem::Hermitian).with_tolerance(1e-10);
        let mut engine = ArnoldiEngine::new(params);
        assert_eq!(drive_dense(&a, &mut engine), status::CONVERGED);
        assert!(engine.iterations() > 1, "expected at least one restart");

        let gram = engine.v.adjoint() * &engine.v;
        assert!((gram - DMatrix::identity(12, 12)).amax() < 1e-10);

        let mut exact: Vec<f64> = a.clone().symmetric_eigen().eigenvalues.iter().copied().collect();
        exact.sort_by(f64::total_cmp);
        let mut found = engine.hermitian_pairs(false).unwrap().values;
        found.sort_by(f64::total_cmp);
        for (got, want) in found.iter().zip(exact.iter()) {
            assert!((got - want).abs() < 1e-8, "got {got} (expected {want})");
        }
    }

    #[test]
    fn max_iterations_status() {
        let n = 200;
        let a = tridiag(n);
        let params = ArnoldiParams::new(n, 4, 9, Which::SmallestMagnitude, Problem::Hermitian).with_max_iter(1);
        let mut engine = ArnoldiEngine::new(params);
        assert_eq!(drive_dense(&a, &mut engine), status::MAX_ITERATIONS);
        assert_eq!(engine.iterations(), 1);
    }

    #[test]
    fn runs_are_deterministic() {
        let a = tridiag(30);
        let run = || {
            let params = ArnoldiParams::new(30, 2, 8, Which::LargestMagnitude, Problem::Hermitian);
            let mut engine = ArnoldiEngine::new(params);
            drive_dense(&a, &mut engine);
            engine.hermitian_pairs(false).unwrap().values
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn operator_views_follow_offsets() {
        let mut ws = Workspace::<f64>::new(2);
        ws.workd = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        ws.ipntr = [4, 0];
        let (x, y) = ws.operator_views();
        assert_eq!(x, &[5.0, 6.0]);
        y[0] = 9.0;
        assert_eq!(ws.workd[0], 9.0);
    }
}
