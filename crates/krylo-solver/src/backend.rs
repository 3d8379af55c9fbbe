//! Engine capability detection and eigen backend selection.
//!
//! [`Capabilities`] reports which engines were compiled in. Callers may
//! restrict the set for a single request, never extend it.
//! [`EigenBackend::select`] picks the engine for a spectral form in one
//! place so entry points do not scatter feature checks.

use std::fmt;

use krylo_core::SpectralForm;

/// Engines available to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Reverse-communication Arnoldi engine.
    pub arnoldi: bool,
    /// Operator-driven Arnoldi engine.
    pub operator_eigs: bool,
    /// Sparse LU factorization engine.
    pub sparse_lu: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

impl Capabilities {
    /// Engines compiled into this build.
    pub fn detect() -> Self {
        Self {
            arnoldi: krylo_engines::HAS_ARNOLDI,
            operator_eigs: krylo_engines::HAS_OPERATOR_EIGS,
            sparse_lu: krylo_engines::HAS_SPARSE_LU,
        }
    }

    pub fn none() -> Self {
        Self {
            arnoldi: false,
            operator_eigs: false,
            sparse_lu: false,
        }
    }

    pub fn without_arnoldi(mut self) -> Self {
        self.arnoldi = false;
        self
    }

    pub fn without_operator_eigs(mut self) -> Self {
        self.operator_eigs = false;
        self
    }

    pub fn without_sparse_lu(mut self) -> Self {
        self.sparse_lu = false;
        self
    }

    /// Intersection with what was compiled in.
    pub fn effective(self) -> Self {
        let built = Self::detect();
        Self {
            arnoldi: self.arnoldi && built.arnoldi,
            operator_eigs: self.operator_eigs && built.operator_eigs,
            sparse_lu: self.sparse_lu && built.sparse_lu,
        }
    }

    /// Shift-invert needs both the Arnoldi and the factorization engine.
    pub fn shift_invert(&self) -> bool {
        self.arnoldi && self.sparse_lu
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.arnoldi {
            names.push("arnoldi");
        }
        if self.operator_eigs {
            names.push("operator-eigs");
        }
        if self.sparse_lu {
            names.push("sparse-lu");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

/// Engine chosen to serve an eigen request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EigenBackend {
    /// Reverse-communication Arnoldi on `(A - sigma I)^-1`.
    ShiftInvertArnoldi,
    /// Reverse-communication Arnoldi on `A`.
    Arnoldi,
    /// Operator-driven Arnoldi on `A` (real operators only).
    OperatorEigs,
}

impl EigenBackend {
    /// Pick an engine for `form`.
    ///
    /// "sm" goes to shift-invert when both the Arnoldi and LU engines are
    /// available. Otherwise the operator-driven engine is preferred for real
    /// input, then the reverse-communication engine. `None` when nothing
    /// qualifies.
    pub fn select(form: SpectralForm, caps: Capabilities, complex: bool) -> Option<Self> {
        let caps = caps.effective();
        if form == SpectralForm::SmallestMagnitude && caps.shift_invert() {
            Some(Self::ShiftInvertArnoldi)
        } else if caps.operator_eigs && !complex {
            Some(Self::OperatorEigs)
        } else if caps.arnoldi {
            Some(Self::Arnoldi)
        } else {
            None
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "shift-invert" | "shift_invert" => Some(Self::ShiftInvertArnoldi),
            "arnoldi" => Some(Self::Arnoldi),
            "operator-eigs" | "operator_eigs" => Some(Self::OperatorEigs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ShiftInvertArnoldi => "shift-invert",
            Self::Arnoldi => "arnoldi",
            Self::OperatorEigs => "operator-eigs",
        }
    }
}

impl fmt::Display for EigenBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftInvertArnoldi => write!(f, "Arnoldi (shift-invert)"),
            Self::Arnoldi => write!(f, "Arnoldi (reverse communication)"),
            Self::OperatorEigs => write!(f, "Arnoldi (operator-driven)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restriction_never_extends() {
        let caps = Capabilities::detect().without_sparse_lu();
        assert!(!caps.sparse_lu);
        assert!(!caps.shift_invert());
        let forced = Capabilities {
            arnoldi: true,
            operator_eigs: true,
            sparse_lu: true,
        };
        assert_eq!(forced.effective(), Capabilities::detect());
    }

    #[test]
    fn nothing_available() {
        assert_eq!(EigenBackend::select(SpectralForm::LargestMagnitude, Capabilities::none(), false), None);
        assert_eq!(Capabilities::none().to_string(), "none");
    }

    #[cfg(all(feature = "arnoldi", feature = "operator-eigs", feature = "sparse-lu"))]
    #[test]
    fn routing_precedence() {
        let all = Capabilities::detect();
        assert_eq!(
            EigenBackend::select(SpectralForm::SmallestMagnitude, all, false),
            Some(EigenBackend::ShiftInvertArnoldi)
        );
        assert_eq!(
            EigenBackend::select(SpectralForm::LargestAlgebraic, all, false),
            Some(EigenBackend::OperatorEigs)
        );
        assert_eq!(
            EigenBackend::select(SpectralForm::LargestAlgebraic, all, true),
            Some(EigenBackend::Arnoldi)
        );
        assert_eq!(
            EigenBackend::select(SpectralForm::SmallestMagnitude, all.without_sparse_lu(), false),
            Some(EigenBackend::OperatorEigs)
        );
        assert_eq!(
            EigenBackend::select(SpectralForm::LargestMagnitude, all.without_operator_eigs(), false),
            Some(EigenBackend::Arnoldi)
        );
        assert_eq!(all.to_string(), "arnoldi, operator-eigs, sparse-lu");
    }

    #[test]
    fn backend_names() {
        for b in [EigenBackend::ShiftInvertArnoldi, EigenBackend::Arnoldi, EigenBackend::OperatorEigs] {
            assert_eq!(EigenBackend::from_name(b.name()), Some(b));
        }
        assert_eq!(EigenBackend::from_name("lapack"), None);
    }
}
