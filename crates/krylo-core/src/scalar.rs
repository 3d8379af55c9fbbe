//! Element kinds shared by every algorithm in krylo.
//!
//! Eigen and solve paths are written once over [`Scalar`], which is
//! implemented for `f64` and [`C64`]. The trait is a thin layer over
//! nalgebra's `ComplexField` so dense kernels (QR, Schur, LU) accept the same
//! element type as the sparse code.

use nalgebra::ComplexField;
pub use num_complex::Complex64 as C64;

/// A real or complex double-precision element.
pub trait Scalar:
    ComplexField<RealField = f64> + Copy + Default + PartialEq + Send + Sync + 'static
{
    /// `true` for the complex kind.
    const IS_COMPLEX: bool;

    /// Widen to a complex number.
    fn to_c64(self) -> C64;

    /// Narrow from a complex number. The real kind keeps only the real part.
    fn from_c64(z: C64) -> Self;

    /// Kind name used in log messages.
    fn kind_name() -> &'static str {
        if Self::IS_COMPLEX { "complex" } else { "real" }
    }
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;

    #[inline]
    fn to_c64(self) -> C64 {
        C64::new(self, 0.0)
    }

    #[inline]
    fn from_c64(z: C64) -> Self {
        z.re
    }
}

impl Scalar for C64 {
    const IS_COMPLEX: bool = true;

    #[inline]
    fn to_c64(self) -> C64 {
        self
    }

    #[inline]
    fn from_c64(z: C64) -> Self {
        z
    }
}

/// Conjugated dot product `sum(conj(a[i]) * b[i])`.
pub fn conjugate_dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc + x.conjugate() * y)
}

/// Euclidean norm of a slice.
pub fn norm2<T: Scalar>(a: &[T]) -> f64 {
    a.iter()
        .map(|x| x.modulus_squared())
        .sum::<f64>()
        .sqrt()
}

/// `y += alpha * x`
pub fn axpy<T: Scalar>(alpha: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}
