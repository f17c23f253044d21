//! Scalar traits used by the `tessel` tile kernels.
//!
//! Every kernel is generic over [`ComplexField`], and is instantiated for `f32`, `f64`,
//! [`c32`] and [`c64`]. Real types implement [`RealField`] as well. The method names are
//! prefixed with `tsl_` so that they never collide with inherent methods or with the operator
//! traits of the standard library.

#![allow(clippy::type_complexity)]

use bytemuck::Pod;
use core::fmt::Debug;
pub use num_complex::Complex;

/// 32-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c32 = Complex<f32>;
/// 64-bit complex floating point type.
#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

/// Unstable trait containing the operations that a number type needs to implement.
pub trait ComplexField: Copy + Debug + PartialEq + Send + Sync + Pod + 'static {
    type Real: RealField;

    /// `true` for real types, for which conjugation is the identity.
    const IS_REAL: bool;

    /// Converts `value` from `f64` to `Self`.
    /// The conversion may be lossy when converting to a type with less precision.
    fn tsl_from_f64(value: f64) -> Self;

    /// Builds a value from its real and imaginary parts. The imaginary part is dropped for real
    /// types.
    fn tsl_from_re_im(re: Self::Real, im: Self::Real) -> Self;

    /// Returns `self + rhs`.
    fn tsl_add(self, rhs: Self) -> Self;
    /// Returns `self - rhs`.
    fn tsl_sub(self, rhs: Self) -> Self;
    /// Returns `self * rhs`.
    fn tsl_mul(self, rhs: Self) -> Self;

    /// Returns `-self`.
    fn tsl_neg(self) -> Self;
    /// Returns `1.0/self`.
    fn tsl_inv(self) -> Self;
    /// Returns `conjugate(self)`.
    fn tsl_conj(self) -> Self;

    /// Returns the absolute value of `self`.
    fn tsl_abs(self) -> Self::Real;
    /// Returns the squared absolute value of `self`.
    fn tsl_abs2(self) -> Self::Real;

    /// Returns a complex number whose real part is equal to `real`, and a zero imaginary part.
    fn tsl_from_real(real: Self::Real) -> Self;

    /// Returns the real part.
    fn tsl_real(self) -> Self::Real;
    /// Returns the imaginary part.
    fn tsl_imag(self) -> Self::Real;

    /// Returns `0.0`.
    fn tsl_zero() -> Self;
    /// Returns `1.0`.
    fn tsl_one() -> Self;
}

/// Unstable trait containing the operations that a real number type needs to implement.
pub trait RealField: ComplexField<Real = Self> + PartialOrd {
    /// Machine epsilon, the distance between `1.0` and the next larger value.
    fn tsl_epsilon() -> Self;
    /// Smallest positive normal value, such that its inverse does not overflow.
    fn tsl_safe_min() -> Self;
    /// Largest finite value.
    fn tsl_max_value() -> Self;

    /// Returns `self / rhs`.
    fn tsl_div(self, rhs: Self) -> Self;
    /// Returns the square root of `self`.
    fn tsl_sqrt(self) -> Self;
    /// Returns the cosine of `self`, in radians.
    fn tsl_cos(self) -> Self;
    /// Returns a value with the magnitude of `self` and the sign of `sign`.
    fn tsl_copysign(self, sign: Self) -> Self;
    /// Returns the smallest value strictly greater than `self`.
    fn tsl_next_up(self) -> Self;

    /// Archimedes' constant.
    fn tsl_pi() -> Self;

    /// Converts `value` to `Self`, possibly losing precision.
    fn tsl_from_usize(value: usize) -> Self;
    /// Converts `self` to `f64`.
    fn tsl_to_f64(self) -> f64;

    /// Returns the larger of the two values.
    #[inline(always)]
    fn tsl_max(self, rhs: Self) -> Self {
        if self >= rhs {
            self
        } else {
            rhs
        }
    }

    /// Returns the smaller of the two values.
    #[inline(always)]
    fn tsl_min(self, rhs: Self) -> Self {
        if self <= rhs {
            self
        } else {
            rhs
        }
    }

    /// Distance from `|self|` to the next representable value above it.
    #[inline(always)]
    fn tsl_ulp(self) -> Self {
        let a = self.tsl_abs();
        a.tsl_next_up().tsl_sub(a)
    }
}

macro_rules! impl_real {
    ($ty: ty, $bits: ty, $pi: expr) => {
        impl ComplexField for $ty {
            type Real = Self;

            const IS_REAL: bool = true;

            #[inline(always)]
            fn tsl_from_f64(value: f64) -> Self {
                value as _
            }

            #[inline(always)]
            fn tsl_from_re_im(re: Self, _: Self) -> Self {
                re
            }

            #[inline(always)]
            fn tsl_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline(always)]
            fn tsl_sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline(always)]
            fn tsl_mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline(always)]
            fn tsl_neg(self) -> Self {
                -self
            }

            #[inline(always)]
            fn tsl_inv(self) -> Self {
                self.recip()
            }

            #[inline(always)]
            fn tsl_conj(self) -> Self {
                self
            }

            #[inline(always)]
            fn tsl_abs(self) -> Self {
                self.abs()
            }

            #[inline(always)]
            fn tsl_abs2(self) -> Self {
                self * self
            }

            #[inline(always)]
            fn tsl_from_real(real: Self) -> Self {
                real
            }

            #[inline(always)]
            fn tsl_real(self) -> Self {
                self
            }

            #[inline(always)]
            fn tsl_imag(self) -> Self {
                0.0
            }

            #[inline(always)]
            fn tsl_zero() -> Self {
                0.0
            }

            #[inline(always)]
            fn tsl_one() -> Self {
                1.0
            }
        }

        impl RealField for $ty {
            #[inline(always)]
            fn tsl_epsilon() -> Self {
                <$ty>::EPSILON
            }

            #[inline(always)]
            fn tsl_safe_min() -> Self {
                <$ty>::MIN_POSITIVE
            }

            #[inline(always)]
            fn tsl_max_value() -> Self {
                <$ty>::MAX
            }

            #[inline(always)]
            fn tsl_div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline(always)]
            fn tsl_sqrt(self) -> Self {
                self.sqrt()
            }

            #[inline(always)]
            fn tsl_cos(self) -> Self {
                self.cos()
            }

            #[inline(always)]
            fn tsl_copysign(self, sign: Self) -> Self {
                self.copysign(sign)
            }

            #[inline]
            fn tsl_next_up(self) -> Self {
                if self.is_nan() || self == <$ty>::INFINITY {
                    return self;
                }
                if self == 0.0 {
                    return <$ty>::from_bits(1);
                }
                let bits = self.to_bits();
                let next = if self > 0.0 { bits + 1 } else { bits - 1 };
                <$ty>::from_bits(next as $bits)
            }

            #[inline(always)]
            fn tsl_pi() -> Self {
                $pi
            }

            #[inline(always)]
            fn tsl_from_usize(value: usize) -> Self {
                value as _
            }

            #[inline(always)]
            fn tsl_to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_real!(f32, u32, core::f32::consts::PI);
impl_real!(f64, u64, core::f64::consts::PI);

macro_rules! impl_complex {
    ($real: ty) => {
        impl ComplexField for Complex<$real> {
            type Real = $real;

            const IS_REAL: bool = false;

            #[inline(always)]
            fn tsl_from_f64(value: f64) -> Self {
                Complex::new(value as _, 0.0)
            }

            #[inline(always)]
            fn tsl_from_re_im(re: $real, im: $real) -> Self {
                Complex::new(re, im)
            }

            #[inline(always)]
            fn tsl_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline(always)]
            fn tsl_sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline(always)]
            fn tsl_mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline(always)]
            fn tsl_neg(self) -> Self {
                -self
            }

            #[inline(always)]
            fn tsl_inv(self) -> Self {
                // scaled to avoid overflow in |z|^2
                let scale = self.re.abs().max(self.im.abs());
                if scale == 0.0 {
                    return Complex::new(<$real>::INFINITY, 0.0);
                }
                let re = self.re / scale;
                let im = self.im / scale;
                let denom = (re * re + im * im) * scale;
                Complex::new(re / denom, -im / denom)
            }

            #[inline(always)]
            fn tsl_conj(self) -> Self {
                Complex::new(self.re, -self.im)
            }

            #[inline(always)]
            fn tsl_abs(self) -> $real {
                self.re.hypot(self.im)
            }

            #[inline(always)]
            fn tsl_abs2(self) -> $real {
                self.re * self.re + self.im * self.im
            }

            #[inline(always)]
            fn tsl_from_real(real: $real) -> Self {
                Complex::new(real, 0.0)
            }

            #[inline(always)]
            fn tsl_real(self) -> $real {
                self.re
            }

            #[inline(always)]
            fn tsl_imag(self) -> $real {
                self.im
            }

            #[inline(always)]
            fn tsl_zero() -> Self {
                Complex::new(0.0, 0.0)
            }

            #[inline(always)]
            fn tsl_one() -> Self {
                Complex::new(1.0, 0.0)
            }
        }
    };
}

impl_complex!(f32);
impl_complex!(f64);
