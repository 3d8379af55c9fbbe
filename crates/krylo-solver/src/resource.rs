//! Exclusive-ownership handles for engine-side structures.
//!
//! Every descriptor, factorization workspace, statistics block and
//! permutation array handed to the factorization engine lives in one of these
//! wrappers. Each wrapper registers itself in a per-thread ledger on creation
//! and deregisters in `Drop`, so every exit path releases exactly once and
//! tests can assert that nothing outlives a call.

use std::cell::Cell;

thread_local! {
    static LIVE: Cell<usize> = const { Cell::new(0) };
}

/// Engine resources currently alive on this thread.
pub fn live_resources() -> usize {
    LIVE.with(Cell::get)
}

/// Ledger entry shared by all wrappers.
#[derive(Debug)]
struct Tracked {
    kind: &'static str,
}

impl Tracked {
    fn new(kind: &'static str) -> Self {
        LIVE.with(|c| c.set(c.get() + 1));
        log::trace!("acquire {kind}");
        Self { kind }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        LIVE.with(|c| c.set(c.get().saturating_sub(1)));
        log::trace!("release {}", self.kind);
    }
}

#[cfg(feature = "sparse-lu")]
pub(crate) use lu::{FactorWorkspace, MatrixDescriptor, PermArray, StatBlock};

#[cfg(feature = "sparse-lu")]
mod lu {
    use krylo_engines::lu::{CompCol, LuFactors, Stat};

    use super::Tracked;
    use crate::error::{Error, Result};

    /// Owned compressed-column copy of a matrix.
    #[derive(Debug)]
    pub(crate) struct MatrixDescriptor<T> {
        inner: CompCol<T>,
        _ledger: Tracked,
    }

    impl<T> MatrixDescriptor<T> {
        pub(crate) fn new(inner: CompCol<T>) -> Self {
            Self {
                inner,
                _ledger: Tracked::new("matrix descriptor"),
            }
        }

        pub(crate) fn get(&self) -> &CompCol<T> {
            &self.inner
        }

        pub(crate) fn get_mut(&mut self) -> &mut CompCol<T> {
            &mut self.inner
        }
    }

    /// Slot receiving the `L` and `U` factors.
    #[derive(Debug)]
    pub(crate) struct FactorWorkspace<T> {
        factors: Option<LuFactors<T>>,
        _ledger: Tracked,
    }

    impl<T> FactorWorkspace<T> {
        pub(crate) fn new() -> Self {
            Self {
                factors: None,
                _ledger: Tracked::new("factor workspace"),
            }
        }

        pub(crate) fn slot(&mut self) -> &mut Option<LuFactors<T>> {
            &mut self.factors
        }

        pub(crate) fn factors(&self) -> Option<&LuFactors<T>> {
            self.factors.as_ref()
        }
    }

    /// Operation counters, logged when released.
    #[derive(Debug)]
    pub(crate) struct StatBlock {
        stat: Stat,
        label: &'static str,
        _ledger: Tracked,
    }

    impl StatBlock {
        pub(crate) fn new(label: &'static str) -> Self {
            Self {
                stat: Stat::new(),
                label,
                _ledger: Tracked::new("statistics block"),
            }
        }

        pub(crate) fn get_mut(&mut self) -> &mut Stat {
            &mut self.stat
        }
    }

    impl Drop for StatBlock {
        fn drop(&mut self) {
            log::debug!("{}: {}", self.label, self.stat);
        }
    }

    /// Zero-initialised integer permutation of length `n`.
    #[derive(Debug)]
    pub(crate) struct PermArray {
        data: Vec<i32>,
        _ledger: Tracked,
    }

    impl PermArray {
        pub(crate) fn new(n: usize) -> Result<Self> {
            let mut data = Vec::new();
            data.try_reserve_exact(n).map_err(|_| Error::Allocation {
                bytes: n.saturating_mul(std::mem::size_of::<i32>()),
            })?;
            data.resize(n, 0);
            Ok(Self {
                data,
                _ledger: Tracked::new("permutation array"),
            })
        }

        pub(crate) fn as_slice(&self) -> &[i32] {
            &self.data
        }

        pub(crate) fn as_mut_slice(&mut self) -> &mut [i32] {
            &mut self.data
        }
    }
}
