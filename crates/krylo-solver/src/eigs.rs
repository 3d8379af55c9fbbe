//! Partial eigen decomposition of sparse matrices.
//!
//! Three entry points share one validation and policy pipeline:
//!
//! - [`eigs_sym`]: symmetric real or Hermitian complex input, real eigenvalues
//! - [`eigs_gen`]: general real input, complex eigenvalues and vectors
//! - [`eigs_gen_complex`]: general complex input
//!
//! Precondition violations are errors. An engine that runs but converges to
//! nothing is not: the result comes back empty with `converged == false`.

use nalgebra::DMatrix;

use krylo_core::{C64, Scalar, SparseMatrix, SpectralForm, is_approx_symmetric};
use krylo_engines::arnoldi::{ArnoldiParams, ComplexPairs, HermitianPairs, Mode, Problem, Which};
#[cfg(feature = "arnoldi")]
use krylo_engines::arnoldi::{ArnoldiEngine, PackedRealPairs, Workspace, status};
#[cfg(feature = "operator-eigs")]
use krylo_engines::operator_eigs::{GenOperatorEigs, SymOperatorEigs};

use crate::backend::{Capabilities, EigenBackend};
use crate::config::EigenOptions;
#[cfg(feature = "arnoldi")]
use crate::driver::{apply_matrix, drive};
use crate::error::{Error, Result};
#[cfg(all(feature = "arnoldi", feature = "sparse-lu"))]
use crate::shift_invert::ShiftInvert;

/// What to compute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralRequest {
    /// Number of eigenvalues wanted.
    pub n_eigvals: usize,
    pub form: SpectralForm,
    /// Shift used by shift-invert for the "sm" form.
    pub sigma: C64,
    pub options: EigenOptions,
    /// Engines this request may use.
    pub capabilities: Capabilities,
}

impl SpectralRequest {
    pub fn new(n_eigvals: usize, form: impl Into<SpectralForm>) -> Self {
        Self {
            n_eigvals,
            form: form.into(),
            sigma: C64::new(0.0, 0.0),
            options: EigenOptions::default(),
            capabilities: Capabilities::detect(),
        }
    }

    pub fn with_sigma(mut self, sigma: impl Into<C64>) -> Self {
        self.sigma = sigma.into();
        self
    }

    pub fn with_options(mut self, options: EigenOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Eigenvalues with matching eigenvectors (one per column).
#[derive(Debug, Clone, PartialEq)]
pub struct EigenResult<V, E: Scalar> {
    pub eigenvalues: Vec<V>,
    pub eigenvectors: DMatrix<E>,
    /// At least one eigenpair converged.
    pub converged: bool,
    /// Engine that served the request; `None` for trivial requests.
    pub backend: Option<EigenBackend>,
}

impl<V, E: Scalar> EigenResult<V, E> {
    fn trivial(n: usize) -> Self {
        Self {
            eigenvalues: Vec::new(),
            eigenvectors: DMatrix::zeros(n, 0),
            converged: true,
            backend: None,
        }
    }

    fn failed(backend: EigenBackend) -> Self {
        Self {
            eigenvalues: Vec::new(),
            eigenvectors: DMatrix::zeros(0, 0),
            converged: false,
            backend: Some(backend),
        }
    }

    fn from_pairs(eigenvalues: Vec<V>, eigenvectors: DMatrix<E>, backend: EigenBackend) -> Self {
        if eigenvalues.is_empty() {
            return Self::failed(backend);
        }
        Self {
            eigenvalues,
            eigenvectors,
            converged: true,
            backend: Some(backend),
        }
    }

    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Symmetric,
    GeneralReal,
    GeneralComplex,
}

impl Path {
    fn operation(self) -> &'static str {
        match self {
            Path::Symmetric => "eigs_sym",
            Path::GeneralReal | Path::GeneralComplex => "eigs_gen",
        }
    }

    fn problem(self) -> Problem {
        match self {
            Path::Symmetric => Problem::Hermitian,
            Path::GeneralReal | Path::GeneralComplex => Problem::General,
        }
    }

    fn accepts(self, form: SpectralForm) -> bool {
        match self {
            Path::Symmetric => form.is_symmetric_form(),
            Path::GeneralReal | Path::GeneralComplex => form.is_general_form(),
        }
    }

    /// General problems need room for a trailing conjugate partner.
    fn count_fits(self, k: usize, n: usize) -> bool {
        match self {
            Path::Symmetric => k < n,
            Path::GeneralReal | Path::GeneralComplex => k + 1 < n,
        }
    }

    fn min_subspace(self, k: usize) -> usize {
        match self {
            Path::Symmetric => k + 1,
            Path::GeneralReal | Path::GeneralComplex => k + 3,
        }
    }

}

/// Precondition checks. `Ok(true)` means there is nothing to compute.
fn validate<T: Scalar>(a: &SparseMatrix<T>, request: &SpectralRequest, path: Path) -> Result<bool> {
    let op = path.operation();
    if !a.is_square() {
        return Err(Error::NotSquare {
            operation: op,
            n_rows: a.n_rows(),
            n_cols: a.n_cols(),
        });
    }
    if !path.accepts(request.form) {
        return Err(Error::UnknownForm {
            operation: op,
            form: request.form.to_string(),
        });
    }
    let (n, k) = (a.n_rows(), request.n_eigvals);
    if !path.count_fits(k, n) {
        return Err(Error::EigenCountOutOfRange {
            operation: op,
            requested: k,
            n,
        });
    }
    Ok(k == 0)
}

/// Krylov subspace dimension: `max(2k + 1, 20)` unless the caller supplies
/// one, then clamped into `[k + 1, n]` (symmetric) or `[k + 3, n]`
/// (general), with an advisory when a supplied value is out of range.
fn subspace_dim(k: usize, n: usize, options: &EigenOptions, path: Path) -> usize {
    let op = path.operation();
    let lo = path.min_subspace(k);
    let requested = options.subspace_dim;
    let ncv = if requested == 0 {
        (2 * k + 1).max(20)
    } else if requested < lo {
        log::warn!("{op}(): subspace_dim must be at least {lo}; using {lo} instead of {requested}");
        lo
    } else if requested > n {
        log::warn!("{op}(): subspace_dim cannot be greater than n_rows; using {n} instead of {requested}");
        n
    } else {
        requested
    };
    ncv.max(lo).min(n)
}

fn which_for(form: SpectralForm, path: Path, shift_invert: bool) -> Which {
    if shift_invert {
        // The wanted eigenvalues of A near sigma are the largest of the inverse.
        return Which::LargestMagnitude;
    }
    let symmetric = path == Path::Symmetric;
    match form {
        SpectralForm::SmallestMagnitude => Which::SmallestMagnitude,
        SpectralForm::LargestAlgebraic if symmetric => Which::LargestAlgebraic,
        SpectralForm::SmallestAlgebraic if symmetric => Which::SmallestAlgebraic,
        SpectralForm::LargestAlgebraic | SpectralForm::LargestReal => Which::LargestReal,
        SpectralForm::SmallestAlgebraic | SpectralForm::SmallestReal => Which::SmallestReal,
        SpectralForm::LargestImaginary => Which::LargestImaginary,
        SpectralForm::SmallestImaginary => Which::SmallestImaginary,
        SpectralForm::LargestMagnitude | SpectralForm::None => Which::LargestMagnitude,
    }
}

fn select_backend(request: &SpectralRequest, path: Path, complex: bool) -> Result<EigenBackend> {
    let backend = EigenBackend::select(request.form, request.capabilities, complex).ok_or(
        Error::Unsupported {
            operation: path.operation(),
            engine: "eigen",
        },
    )?;
    log::debug!(
        "{}(): k={} form={} via {}",
        path.operation(),
        request.n_eigvals,
        request.form,
        backend
    );
    Ok(backend)
}

/// Advisories about a shift the chosen engine will not use.
fn advise_shift(request: &SpectralRequest, backend: EigenBackend, path: Path, sigma: C64) {
    if sigma.norm() <= f64::EPSILON {
        return;
    }
    let op = path.operation();
    if request.form != SpectralForm::SmallestMagnitude {
        log::debug!("{op}(): sigma is only used with form \"sm\"; ignoring {sigma}");
    } else if backend != EigenBackend::ShiftInvertArnoldi {
        log::warn!(
            "{op}(): getting eigenvalues around 0 instead of {sigma} because shift-invert is not available"
        );
    }
}

/// Shift restricted to the real line, with an advisory when the imaginary
/// part is dropped.
fn real_shift(sigma: C64, path: Path) -> C64 {
    if sigma.im != 0.0 {
        log::warn!(
            "{}(): imaginary part of sigma ({}) discarded",
            path.operation(),
            sigma.im
        );
    }
    C64::new(sigma.re, 0.0)
}

fn engine_params(n: usize, k: usize, request: &SpectralRequest, path: Path, backend: EigenBackend, sigma: C64) -> ArnoldiParams {
    let shift_invert = backend == EigenBackend::ShiftInvertArnoldi;
    let ncv = subspace_dim(k, n, &request.options, path);
    let mode = if shift_invert {
        Mode::ShiftInvert { sigma }
    } else {
        Mode::Regular
    };
    ArnoldiParams::new(n, k, ncv, which_for(request.form, path, shift_invert), path.problem())
        .with_mode(mode)
        .with_tolerance(request.options.effective_tolerance())
        .with_max_iter(request.options.max_iterations)
}

/// Run the reverse-communication engine on `A` or on `(A - sigma I)^-1`.
#[cfg(feature = "arnoldi")]
fn run_reverse<T: Scalar>(a: &SparseMatrix<T>, params: ArnoldiParams) -> Result<(ArnoldiEngine<T>, i32)> {
    let mut engine = ArnoldiEngine::new(params);
    let mut ws = Workspace::new(params.n);
    let info = match params.mode {
        #[cfg(feature = "sparse-lu")]
        Mode::ShiftInvert { sigma } => {
            let mut si = ShiftInvert::factorize(a, T::from_c64(sigma))?;
            drive(&mut engine, &mut ws, |x, y| si.solve(x, y))?
        }
        #[cfg(not(feature = "sparse-lu"))]
        Mode::ShiftInvert { .. } => {
            return Err(Error::Unsupported {
                operation: "shift-invert",
                engine: "sparse LU",
            });
        }
        Mode::Regular => drive(&mut engine, &mut ws, |x, y| {
            apply_matrix(a, x, y);
            Ok(())
        })?,
    };
    Ok((engine, info))
}

/// A finished run with at least one converged pair.
#[cfg(feature = "arnoldi")]
fn usable(info: i32, nconv: usize) -> bool {
    matches!(info, status::CONVERGED | status::MAX_ITERATIONS) && nconv > 0
}

/// Real copy of a matrix whose kind is real.
#[cfg(feature = "operator-eigs")]
fn to_real<T: Scalar>(a: &SparseMatrix<T>) -> Result<SparseMatrix<f64>> {
    let entries: Vec<_> = a.iter().map(|(r, c, v)| (r, c, v.to_c64().re)).collect();
    Ok(SparseMatrix::from_triplets(a.n_rows(), a.n_cols(), &entries)?)
}

fn unsupported(path: Path) -> Error {
    Error::Unsupported {
        operation: path.operation(),
        engine: "eigen",
    }
}

/// Eigenpairs of a symmetric (or Hermitian) matrix, eigenvalues ascending.
///
/// ```
/// use krylo_core::SparseMatrix;
/// use krylo_solver::{SpectralRequest, eigs_sym};
///
/// let a = SparseMatrix::from_triplets(4, 4, &[
///     (0, 0, 2.0), (1, 1, 2.0), (2, 2, 2.0), (3, 3, 2.0),
///     (0, 1, -1.0), (1, 0, -1.0), (1, 2, -1.0), (2, 1, -1.0), (2, 3, -1.0), (3, 2, -1.0),
/// ]).unwrap();
/// let res = eigs_sym(&a, &SpectralRequest::new(2, "la")).unwrap();
/// assert!(res.converged);
/// assert_eq!(res.eigenvalues.len(), 2);
/// ```
pub fn eigs_sym<T: Scalar>(a: &SparseMatrix<T>, request: &SpectralRequest) -> Result<EigenResult<f64, T>> {
    let path = Path::Symmetric;
    if validate(a, request, path)? {
        return Ok(EigenResult::trivial(a.n_rows()));
    }
    let a = a.synced();
    if !is_approx_symmetric(&*a) {
        let what = if T::IS_COMPLEX { "hermitian" } else { "symmetric" };
        log::warn!("eigs_sym(): given matrix is not {what}");
    }
    let backend = select_backend(request, path, T::IS_COMPLEX)?;
    let sigma = real_shift(request.sigma, path);
    advise_shift(request, backend, path, sigma);
    let (n, k) = (a.n_rows(), request.n_eigvals);
    let params = engine_params(n, k, request, path, backend, sigma);

    let pairs: Option<HermitianPairs<T>> = match backend {
        #[cfg(feature = "operator-eigs")]
        EigenBackend::OperatorEigs => {
            let real = to_real(&*a)?;
            let mut eigs = SymOperatorEigs::new(&real, k, params.ncv, params.which);
            let nconv = eigs.compute(params.max_iter, params.tol);
            if nconv == 0 {
                None
            } else {
                eigs.converged_pairs().map(|p| HermitianPairs {
                    values: p.values,
                    vectors: p.vectors.map(T::from_real),
                })
            }
        }
        #[cfg(feature = "arnoldi")]
        EigenBackend::Arnoldi | EigenBackend::ShiftInvertArnoldi => {
            let (engine, info) = run_reverse(&*a, params)?;
            if usable(info, engine.nconv()) {
                engine.hermitian_pairs(true)
            } else {
                None
            }
        }
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported(path)),
    };

    let Some(pairs) = pairs else {
        log::debug!("eigs_sym(): no eigenpairs converged");
        return Ok(EigenResult::failed(backend));
    };
    let (values, vectors) = sort_ascending(pairs);
    Ok(EigenResult::from_pairs(values, vectors, backend))
}

fn sort_ascending<T: Scalar>(pairs: HermitianPairs<T>) -> (Vec<f64>, DMatrix<T>) {
    let mut order: Vec<usize> = (0..pairs.values.len()).collect();
    order.sort_by(|&i, &j| pairs.values[i].total_cmp(&pairs.values[j]));
    let values = order.iter().map(|&i| pairs.values[i]).collect();
    let vectors = DMatrix::from_fn(pairs.vectors.nrows(), order.len(), |r, c| pairs.vectors[(r, order[c])]);
    (values, vectors)
}

/// Eigenpairs of a general real matrix.
///
/// Complex eigenvalues come in conjugate pairs; both members are returned
/// next to each other (positive imaginary part first) with conjugate
/// eigenvectors.
pub fn eigs_gen(a: &SparseMatrix<f64>, request: &SpectralRequest) -> Result<EigenResult<C64, C64>> {
    let path = Path::GeneralReal;
    if validate(a, request, path)? {
        return Ok(EigenResult::trivial(a.n_rows()));
    }
    let a = a.synced();
    let backend = select_backend(request, path, false)?;
    let sigma = real_shift(request.sigma, path);
    advise_shift(request, backend, path, sigma);
    let (n, k) = (a.n_rows(), request.n_eigvals);
    let params = engine_params(n, k, request, path, backend, sigma);

    let pairs: Option<ComplexPairs> = match backend {
        #[cfg(feature = "operator-eigs")]
        EigenBackend::OperatorEigs => {
            let mut eigs = GenOperatorEigs::new(&*a, k, params.ncv, params.which);
            let nconv = eigs.compute(params.max_iter, params.tol);
            if nconv == 0 { None } else { eigs.converged_pairs() }
        }
        #[cfg(feature = "arnoldi")]
        EigenBackend::Arnoldi | EigenBackend::ShiftInvertArnoldi => {
            let (engine, info) = run_reverse(&*a, params)?;
            if info == status::CONVERGED {
                engine.packed_real_pairs().map(|p| unpack_real_pairs(&p))
            } else if usable(info, engine.nconv()) {
                engine.complex_pairs(true)
            } else {
                None
            }
        }
        #[allow(unreachable_patterns)]
        _ => return Err(unsupported(path)),
    };
    Ok(finish_general(pairs, backend))
}

/// Eigenpairs of a general complex matrix.
pub fn eigs_gen_complex(a: &SparseMatrix<C64>, request: &SpectralRequest) -> Result<EigenResult<C64, C64>> {
    let path = Path::GeneralComplex;
    if validate(a, request, path)? {
        return Ok(EigenResult::trivial(a.n_rows()));
    }
    let a = a.synced();
    let backend = select_backend(request, path, true)?;
    advise_shift(request, backend, path, request.sigma);
    let (n, k) = (a.n_rows(), request.n_eigvals);
    let params = engine_params(n, k, request, path, backend, request.sigma);

    let pairs: Option<ComplexPairs> = match backend {
        #[cfg(feature = "arnoldi")]
        EigenBackend::Arnoldi | EigenBackend::ShiftInvertArnoldi => {
            let (engine, info) = run_reverse(&*a, params)?;
            if usable(info, engine.nconv()) {
                engine.complex_pairs(true)
            } else {
                None
            }
        }
        _ => return Err(unsupported(path)),
    };
    Ok(finish_general(pairs, backend))
}

fn finish_general(pairs: Option<ComplexPairs>, backend: EigenBackend) -> EigenResult<C64, C64> {
    match pairs {
        Some(p) => EigenResult::from_pairs(p.values, p.vectors, backend),
        None => {
            log::debug!("eigs_gen(): no eigenpairs converged");
            EigenResult::failed(backend)
        }
    }
}

/// Rebuild complex eigenpairs from the packed real layout.
///
/// Value `i` and `i + 1` are taken as a conjugate pair when they are exact
/// conjugates; the pair's vector is `z[:, i] +- i z[:, i + 1]`. A complex
/// value in the last wanted slot has no partner in range, so only its own
/// vector (from columns `i` and `i + 1`) is kept.
#[cfg(feature = "arnoldi")]
fn unpack_real_pairs(p: &PackedRealPairs) -> ComplexPairs {
    use nalgebra::DVector;

    let n = p.z.nrows();
    let k = p.nev;
    let column = |re: usize, im: Option<usize>, sign: f64| {
        DVector::from_fn(n, |r, _| C64::new(p.z[(r, re)], im.map_or(0.0, |c| sign * p.z[(r, c)])))
    };

    let mut values = Vec::with_capacity(k);
    let mut vectors = DMatrix::zeros(n, k);
    let mut i = 0;
    while i < k {
        let lambda = C64::new(p.dr[i], p.di[i]);
        values.push(lambda);
        if lambda.im == 0.0 {
            vectors.set_column(i, &column(i, None, 1.0));
            i += 1;
            continue;
        }
        vectors.set_column(i, &column(i, Some(i + 1), 1.0));
        let paired = i + 1 < k && C64::new(p.dr[i + 1], p.di[i + 1]) == lambda.conj();
        if paired {
            values.push(lambda.conj());
            vectors.set_column(i + 1, &column(i, Some(i + 1), -1.0));
            i += 2;
        } else {
            i += 1;
        }
    }
    ComplexPairs { values, vectors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag(n: usize) -> SparseMatrix<f64> {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 2.0));
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
                t.push((i + 1, i, -1.0));
            }
        }
        SparseMatrix::from_triplets(n, n, &t).unwrap()
    }

    #[test]
    fn subspace_policy() {
        let o = EigenOptions::default();
        assert_eq!(subspace_dim(2, 100, &o, Path::Symmetric), 20);
        assert_eq!(subspace_dim(15, 100, &o, Path::Symmetric), 31);
        assert_eq!(subspace_dim(2, 10, &o, Path::Symmetric), 10);
        assert_eq!(subspace_dim(3, 100, &o.with_subspace_dim(2), Path::Symmetric), 4);
        assert_eq!(subspace_dim(3, 100, &o.with_subspace_dim(2), Path::GeneralReal), 6);
        assert_eq!(subspace_dim(3, 50, &o.with_subspace_dim(80), Path::GeneralReal), 50);
        assert_eq!(subspace_dim(3, 50, &o.with_subspace_dim(12), Path::GeneralReal), 12);
        // k = n - 2 on the general path leaves exactly n.
        assert_eq!(subspace_dim(4, 6, &o, Path::GeneralReal), 6);
    }

    #[test]
    fn which_mapping() {
        assert_eq!(
            which_for(SpectralForm::LargestAlgebraic, Path::Symmetric, false),
            Which::LargestAlgebraic
        );
        assert_eq!(which_for(SpectralForm::LargestAlgebraic, Path::GeneralReal, false), Which::LargestReal);
        assert_eq!(
            which_for(SpectralForm::SmallestMagnitude, Path::Symmetric, true),
            Which::LargestMagnitude
        );
        assert_eq!(
            which_for(SpectralForm::SmallestImaginary, Path::GeneralComplex, false),
            Which::SmallestImaginary
        );
    }

    #[test]
    fn validation_order() {
        let a = tridiag(5);
        let rect = SparseMatrix::<f64>::new(3, 4);
        assert!(matches!(
            validate(&rect, &SpectralRequest::new(1, "lm"), Path::Symmetric),
            Err(Error::NotSquare { .. })
        ));
        assert!(matches!(
            validate(&a, &SpectralRequest::new(1, "lr"), Path::Symmetric),
            Err(Error::UnknownForm { .. })
        ));
        assert!(matches!(
            validate(&a, &SpectralRequest::new(1, "xx"), Path::GeneralReal),
            Err(Error::UnknownForm { .. })
        ));
        assert!(validate(&a, &SpectralRequest::new(0, "lm"), Path::Symmetric).unwrap());
        assert!(!validate(&a, &SpectralRequest::new(4, "lm"), Path::Symmetric).unwrap());
        assert!(matches!(
            validate(&a, &SpectralRequest::new(5, "lm"), Path::Symmetric),
            Err(Error::EigenCountOutOfRange { .. })
        ));
        assert!(!validate(&a, &SpectralRequest::new(3, "lm"), Path::GeneralReal).unwrap());
        assert!(matches!(
            validate(&a, &SpectralRequest::new(4, "lm"), Path::GeneralReal),
            Err(Error::EigenCountOutOfRange { .. })
        ));
    }

    #[test]
    fn count_bound_precedes_trivial_case() {
        let empty = SparseMatrix::<f64>::new(0, 0);
        for k in [0, 1] {
            assert!(matches!(
                validate(&empty, &SpectralRequest::new(k, "lm"), Path::Symmetric),
                Err(Error::EigenCountOutOfRange { n: 0, .. })
            ));
        }
        let one = SparseMatrix::<f64>::identity(1);
        assert!(matches!(
            validate(&one, &SpectralRequest::new(0, "lm"), Path::GeneralReal),
            Err(Error::EigenCountOutOfRange { requested: 0, n: 1, .. })
        ));
        assert!(validate(&one, &SpectralRequest::new(0, "lm"), Path::Symmetric).unwrap());
    }

    #[test]
    fn sorted_ascending_with_vectors() {
        let pairs = HermitianPairs {
            values: vec![3.0, 1.0, 2.0],
            vectors: DMatrix::from_row_slice(1, 3, &[30.0, 10.0, 20.0]),
        };
        let (values, vectors) = sort_ascending(pairs);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert_eq!(vectors.row(0).iter().copied().collect::<Vec<_>>(), vec![10.0, 20.0, 30.0]);
    }

    #[cfg(feature = "arnoldi")]
    #[test]
    fn unpack_pairs_and_trailing_half() {
        // Slot 0 real, slots 1-2 a conjugate pair, slot 3 complex with its
        // partner in the spare column.
        let z = DMatrix::from_row_slice(2, 5, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let p = PackedRealPairs {
            dr: vec![5.0, 1.0, 1.0, 0.5, 0.5],
            di: vec![0.0, 2.0, -2.0, 1.0, -1.0],
            z,
            nev: 4,
        };
        let out = unpack_real_pairs(&p);
        assert_eq!(out.values.len(), 4);
        assert_eq!(out.values[2], out.values[1].conj());
        assert_eq!(out.vectors[(0, 1)], C64::new(2.0, 3.0));
        assert_eq!(out.vectors[(0, 2)], C64::new(2.0, -3.0));
        assert_eq!(out.vectors[(1, 3)], C64::new(9.0, 10.0));
        assert_eq!(out.vectors[(1, 0)], C64::new(6.0, 0.0));
    }

    #[test]
    fn restricted_capabilities_are_unsupported() {
        let a = tridiag(6);
        let request = SpectralRequest::new(2, "lm").with_capabilities(Capabilities::none());
        assert!(matches!(eigs_sym(&a, &request), Err(Error::Unsupported { .. })));
        assert!(matches!(eigs_gen(&a, &request), Err(Error::Unsupported { .. })));
    }

    #[cfg(feature = "arnoldi")]
    #[test]
    fn complex_path_skips_operator_engine() {
        let t: Vec<_> = (0..8).map(|i| (i, i, C64::new(i as f64 + 1.0, 0.5))).collect();
        let a = SparseMatrix::from_triplets(8, 8, &t).unwrap();
        let res = eigs_gen_complex(&a, &SpectralRequest::new(2, "lm")).unwrap();
        assert_eq!(res.backend, Some(EigenBackend::Arnoldi));
        assert!(res.converged);
        assert!((res.eigenvalues[0] - C64::new(8.0, 0.5)).norm() < 1e-10);
    }
}
