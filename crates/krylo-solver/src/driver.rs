//! Reverse-communication loop around the Arnoldi engine.
//!
//! The engine signals what it needs through `ido`; [`Signal`] names those
//! states and [`drive`] dispatches on them until the engine stops. The
//! operator itself is a plain function of an input and an output slice, so
//! the loop never sees whether it is a matrix product or a shift-invert
//! solve.

use krylo_core::{Scalar, SparseMatrix};
use krylo_engines::arnoldi::{ArnoldiEngine, IDO_APPLY, IDO_APPLY_FIRST, IDO_DONE, IDO_FIRST, Workspace, status};

use crate::error::Result;

/// Engine request decoded from `ido`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// First call; the engine allocates its state.
    Init,
    /// Compute `y = OP(x)` at the offsets in `ipntr`.
    ApplyOperator,
    /// Terminal: the run finished and `info` holds its status.
    Converged,
    /// Unknown signal; terminal.
    Fault(i32),
}

impl Signal {
    pub fn from_ido(ido: i32) -> Self {
        match ido {
            IDO_FIRST => Signal::Init,
            IDO_APPLY_FIRST | IDO_APPLY => Signal::ApplyOperator,
            IDO_DONE => Signal::Converged,
            other => Signal::Fault(other),
        }
    }
}

/// `y = A x` by one pass over the stored nonzeros.
pub(crate) fn apply_matrix<T: Scalar>(a: &SparseMatrix<T>, x: &[T], y: &mut [T]) {
    y.fill(T::zero());
    for (r, c, v) in a.iter() {
        y[r] += v * x[c];
    }
}

/// Run the engine to completion, answering every operator request with `op`.
///
/// Returns the engine's status code: `0` converged, `1` iteration limit,
/// anything else an engine error (already logged here). An operator failure
/// abandons the run and is returned as the error.
pub(crate) fn drive<T: Scalar>(
    engine: &mut ArnoldiEngine<T>,
    ws: &mut Workspace<T>,
    mut op: impl FnMut(&[T], &mut [T]) -> Result<()>,
) -> Result<i32> {
    let mut ido = IDO_FIRST;
    let mut requests = 0usize;
    loop {
        engine.iterate(&mut ido, ws);
        match Signal::from_ido(ido) {
            Signal::ApplyOperator => {
                let (x, y) = ws.operator_views();
                if let Err(err) = op(x, y) {
                    log::warn!("arnoldi: operator failed after {requests} requests: {err}");
                    return Err(err);
                }
                requests += 1;
            }
            Signal::Converged => break,
            Signal::Init => {
                log::warn!("arnoldi: engine returned to its initial state");
                ws.info = status::NO_FACTORIZATION;
                break;
            }
            Signal::Fault(code) => {
                log::warn!("arnoldi: unexpected reverse-communication signal {code}");
                break;
            }
        }
    }
    log::trace!("arnoldi: {} operator requests over {} restarts", requests, engine.iterations());

    match ws.info {
        status::CONVERGED | status::MAX_ITERATIONS => {}
        code => log::warn!("arnoldi: engine stopped with error code {code}"),
    }
    Ok(ws.info)
}
