//! Operator-driven eigen engine.
//!
//! Runs the implicitly restarted Arnoldi iteration directly against a
//! [`LinearOperator`], without reverse communication. Only real operators
//! and the regular mode are supported; shift-invert needs the factorization
//! engine and goes through the reverse-communication path instead.

use log::debug;

use crate::arnoldi::{
    ArnoldiEngine, ArnoldiParams, ComplexPairs, HermitianPairs, IDO_DONE, IDO_FIRST, Problem, Which, Workspace, status,
};
use crate::operator::LinearOperator;

/// Symmetric eigen solver over a real operator.
pub struct SymOperatorEigs<'a, O: LinearOperator<f64>> {
    inner: OperatorEigs<'a, O>,
}

/// General eigen solver over a real operator.
pub struct GenOperatorEigs<'a, O: LinearOperator<f64>> {
    inner: OperatorEigs<'a, O>,
}

struct OperatorEigs<'a, O: LinearOperator<f64>> {
    op: &'a O,
    params: ArnoldiParams,
    engine: Option<ArnoldiEngine<f64>>,
}

impl<'a, O: LinearOperator<f64>> OperatorEigs<'a, O> {
    fn new(op: &'a O, nev: usize, ncv: usize, which: Which, problem: Problem) -> Self {
        Self {
            op,
            params: ArnoldiParams::new(op.dim(), nev, ncv, which, problem),
            engine: None,
        }
    }

    /// Run to completion and return the number of converged pairs.
    fn compute(&mut self, max_iter: usize, tol: f64) -> usize {
        let params = self.params.with_max_iter(max_iter).with_tolerance(tol);
        let mut engine = ArnoldiEngine::new(params);
        let mut ws = Workspace::new(params.n);
        let mut ido = IDO_FIRST;
        loop {
            engine.iterate(&mut ido, &mut ws);
            if ido == IDO_DONE {
                break;
            }
            let (x, y) = ws.operator_views();
            self.op.apply(x, y);
        }

        let nconv = match ws.info {
            status::CONVERGED | status::MAX_ITERATIONS => engine.nconv(),
            code => {
                debug!("operator eigs: engine stopped with status {code}");
                0
            }
        };
        debug!(
            "operator eigs: {} of {} converged in {} cycles ({} products)",
            nconv,
            params.nev,
            engine.iterations(),
            engine.op_applications()
        );
        self.engine = Some(engine);
        nconv
    }
}

impl<'a, O: LinearOperator<f64>> SymOperatorEigs<'a, O> {
    pub fn new(op: &'a O, nev: usize, ncv: usize, which: Which) -> Self {
        Self {
            inner: OperatorEigs::new(op, nev, ncv, which, Problem::Hermitian),
        }
    }

    pub fn compute(&mut self, max_iter: usize, tol: f64) -> usize {
        self.inner.compute(max_iter, tol)
    }

    /// Converged eigenpairs in wanted order.
    pub fn converged_pairs(&self) -> Option<HermitianPairs<f64>> {
        self.inner.engine.as_ref()?.hermitian_pairs(true)
    }
}

impl<'a, O: LinearOperator<f64>> GenOperatorEigs<'a, O> {
    pub fn new(op: &'a O, nev: usize, ncv: usize, which: Which) -> Self {
        Self {
            inner: OperatorEigs::new(op, nev, ncv, which, Problem::General),
        }
    }

    pub fn compute(&mut self, max_iter: usize, tol: f64) -> usize {
        self.inner.compute(max_iter, tol)
    }

    /// Converged eigenpairs in wanted order as complex values and vectors.
    pub fn converged_pairs(&self) -> Option<ComplexPairs> {
        self.inner.engine.as_ref()?.complex_pairs(true)
    }
}
