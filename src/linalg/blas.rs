//! Level 1, 2 and 3 operations.
//!
//! Vectors are passed as single-column views. A row of a matrix can be used as a vector through
//! `mat.row(i).transpose()`. Matrix products of `f32`, `f64`, [`c32`] and [`c64`] run on the
//! microkernels of the `gemm` crate.

use crate::{assert, c32, c64, ComplexField, Conj, MatMut, MatRef, RealField};
use core::any::TypeId;

/// Copies `src` into `dst`.
#[track_caller]
#[inline]
pub fn copy<E: ComplexField>(dst: MatMut<'_, E>, src: MatRef<'_, E>) {
    let mut dst = dst;
    dst.copy_from(src);
}

/// Computes `dst += alpha * src`.
#[track_caller]
pub fn axpy<E: ComplexField>(dst: MatMut<'_, E>, src: MatRef<'_, E>, alpha: E) {
    let mut dst = dst;
    assert!(all(dst.nrows() == src.nrows(), dst.ncols() == src.ncols()));
    if alpha == E::tsl_zero() {
        return;
    }
    for j in 0..dst.ncols() {
        for i in 0..dst.nrows() {
            let v = dst.read(i, j).tsl_add(alpha.tsl_mul(src.read(i, j)));
            dst.write(i, j, v);
        }
    }
}

/// Replaces every element of `mat` by its conjugate. No-op for real types.
pub fn conj_in_place<E: ComplexField>(mat: MatMut<'_, E>) {
    if E::IS_REAL {
        return;
    }
    let mut mat = mat;
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let v = mat.read(i, j).tsl_conj();
            mat.write(i, j, v);
        }
    }
}

#[inline(always)]
fn is<E: 'static, T: 'static>() -> bool {
    TypeId::of::<E>() == TypeId::of::<T>()
}

/// # Safety
/// `E` and `T` must be the same type, and `acc` must not alias `lhs` or `rhs`.
unsafe fn gemm_as<E: ComplexField, T: 'static>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
) {
    let (m, n, k) = (acc.nrows(), acc.ncols(), lhs.ncols());
    let (dst_rs, dst_cs) = (acc.row_stride(), acc.col_stride());
    gemm::gemm::<T>(
        m,
        n,
        k,
        acc.as_ptr_mut() as *mut T,
        dst_cs,
        dst_rs,
        alpha.is_some(),
        lhs.as_ptr() as *const T,
        lhs.col_stride(),
        lhs.row_stride(),
        rhs.as_ptr() as *const T,
        rhs.col_stride(),
        rhs.row_stride(),
        core::mem::transmute_copy(&alpha.unwrap_or(E::tsl_zero())),
        core::mem::transmute_copy(&beta),
        false,
        conj_lhs == Conj::Yes,
        conj_rhs == Conj::Yes,
        gemm::Parallelism::None,
    );
}

fn matmul_fallback<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
) {
    let mut acc = acc;
    let op = |value: E, conj: Conj| match conj {
        Conj::Yes => value.tsl_conj(),
        Conj::No => value,
    };
    for j in 0..acc.ncols() {
        for i in 0..acc.nrows() {
            let mut dot = E::tsl_zero();
            for p in 0..lhs.ncols() {
                let prod = op(lhs.read(i, p), conj_lhs).tsl_mul(op(rhs.read(p, j), conj_rhs));
                dot = dot.tsl_add(prod);
            }
            let init = match alpha {
                Some(alpha) => alpha.tsl_mul(acc.read(i, j)),
                None => E::tsl_zero(),
            };
            acc.write(i, j, init.tsl_add(beta.tsl_mul(dot)));
        }
    }
}

/// Computes the matrix product `acc = alpha * acc + beta * op(lhs) * op(rhs)`, where `op`
/// conjugates its argument when the matching `conj_*` flag is [`Conj::Yes`].
///
/// If `alpha` is `None`, `acc` is overwritten and its previous contents are never read.
/// `acc` must not overlap `lhs` or `rhs`.
#[track_caller]
pub fn matmul<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    conj_lhs: Conj,
    rhs: MatRef<'_, E>,
    conj_rhs: Conj,
    alpha: Option<E>,
    beta: E,
) {
    let mut acc = acc;
    assert!(all(
        acc.nrows() == lhs.nrows(),
        acc.ncols() == rhs.ncols(),
        lhs.ncols() == rhs.nrows(),
    ));

    if acc.nrows() == 0 || acc.ncols() == 0 {
        return;
    }
    if lhs.ncols() == 0 {
        match alpha {
            Some(alpha) => scale(acc, alpha),
            None => acc.fill_zero(),
        }
        return;
    }

    // SAFETY: the type ids match, and the views are disjoint by contract.
    unsafe {
        if is::<E, f32>() {
            gemm_as::<E, f32>(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta)
        } else if is::<E, f64>() {
            gemm_as::<E, f64>(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta)
        } else if is::<E, c32>() {
            gemm_as::<E, gemm::c32>(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta)
        } else if is::<E, c64>() {
            gemm_as::<E, gemm::c64>(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta)
        } else {
            matmul_fallback(acc, lhs, conj_lhs, rhs, conj_rhs, alpha, beta)
        }
    }
}

/// Computes the matrix-vector product `acc = alpha * acc + beta * lhs * rhs`, where `acc` and
/// `rhs` are column vectors.
///
/// If `alpha` is `None`, `acc` is overwritten and its previous contents are never read.
#[track_caller]
pub fn gemv<E: ComplexField>(
    acc: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    rhs: MatRef<'_, E>,
    alpha: Option<E>,
    beta: E,
) {
    assert!(all(acc.ncols() == 1, rhs.ncols() == 1));
    matmul(acc, lhs, Conj::No, rhs, Conj::No, alpha, beta);
}

/// Computes the conjugated rank one update `acc += beta * lhs * rhs^H`, where `lhs` and `rhs`
/// are column vectors.
#[track_caller]
pub fn gerc<E: ComplexField>(acc: MatMut<'_, E>, lhs: MatRef<'_, E>, rhs: MatRef<'_, E>, beta: E) {
    assert!(all(lhs.ncols() == 1, rhs.ncols() == 1));
    matmul(
        acc,
        lhs,
        Conj::No,
        rhs.transpose(),
        Conj::Yes,
        Some(E::tsl_one()),
        beta,
    );
}

/// Computes `x = tri * x`, where `tri` is upper triangular with a non unit diagonal. The strictly
/// lower part of `tri` is not accessed.
#[track_caller]
pub fn trmv_upper<E: ComplexField>(tri: MatRef<'_, E>, x: MatMut<'_, E>) {
    let mut x = x;
    let n = tri.nrows();
    assert!(all(tri.ncols() == n, x.nrows() == n, x.ncols() == 1));

    for i in 0..n {
        let mut acc = E::tsl_zero();
        for j in i..n {
            acc = acc.tsl_add(tri.read(i, j).tsl_mul(x.read(j, 0)));
        }
        x.write(i, 0, acc);
    }
}

/// Returns the euclidean norm of all the elements of `mat`, computed without undue overflow or
/// underflow.
pub fn norm_l2<E: ComplexField>(mat: MatRef<'_, E>) -> E::Real {
    let zero = E::Real::tsl_zero();
    let one = E::Real::tsl_one();
    let mut scale = zero;
    let mut ssq = one;

    let mut accumulate = |value: E::Real| {
        if value != zero {
            let abs = value.tsl_abs();
            if scale < abs {
                let r = scale.tsl_div(abs);
                ssq = one.tsl_add(ssq.tsl_mul(r.tsl_mul(r)));
                scale = abs;
            } else {
                let r = abs.tsl_div(scale);
                ssq = ssq.tsl_add(r.tsl_mul(r));
            }
        }
    };

    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let v = mat.read(i, j);
            accumulate(v.tsl_real());
            if !E::IS_REAL {
                accumulate(v.tsl_imag());
            }
        }
    }
    scale.tsl_mul(ssq.tsl_sqrt())
}

/// Scales every element of `mat` by `alpha`.
pub fn scale<E: ComplexField>(mat: MatMut<'_, E>, alpha: E) {
    let mut mat = mat;
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let v = mat.read(i, j).tsl_mul(alpha);
            mat.write(i, j, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use crate::{c64, Mat};
    use assert_approx_eq::assert_approx_eq;
    use rand::prelude::*;

    thread_local! {
        static RNG: std::cell::RefCell<StdRng> = std::cell::RefCell::new(StdRng::seed_from_u64(0));
    }

    fn random_c64() -> c64 {
        RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            c64::new(rng.gen(), rng.gen())
        })
    }

    fn assert_c64_close(a: c64, b: c64) {
        assert_approx_eq!(a.re, b.re);
        assert_approx_eq!(a.im, b.im);
    }

    #[test]
    fn gemv_matches_definition() {
        let a = Mat::from_fn(5, 3, |_, _| random_c64());
        let x = Mat::from_fn(3, 1, |_, _| random_c64());
        let y0 = Mat::from_fn(5, 1, |_, _| random_c64());
        let (alpha, beta) = (random_c64(), random_c64());

        let mut y = y0.clone();
        gemv(y.as_mut(), a.as_ref(), x.as_ref(), Some(alpha), beta);

        for i in 0..5 {
            let mut expected = alpha * y0.read(i, 0);
            for j in 0..3 {
                expected += beta * a.read(i, j) * x.read(j, 0);
            }
            assert_c64_close(y.read(i, 0), expected);
        }
    }

    #[test]
    fn matmul_matches_definition() {
        let a = Mat::from_fn(4, 6, |_, _| random_c64());
        let b = Mat::from_fn(3, 6, |_, _| random_c64());
        let c0 = Mat::from_fn(4, 3, |_, _| random_c64());
        let (alpha, beta) = (random_c64(), random_c64());

        for conj_lhs in [Conj::No, Conj::Yes] {
            for conj_rhs in [Conj::No, Conj::Yes] {
                // rhs is a transposed view, so its rows are not contiguous
                let mut c = c0.clone();
                let rhs = b.as_ref().transpose();
                matmul(c.as_mut(), a.as_ref(), conj_lhs, rhs, conj_rhs, Some(alpha), beta);

                let mut expected = c0.clone();
                matmul_fallback(
                    expected.as_mut(),
                    a.as_ref(),
                    conj_lhs,
                    rhs,
                    conj_rhs,
                    Some(alpha),
                    beta,
                );
                for j in 0..3 {
                    for i in 0..4 {
                        assert_c64_close(c.read(i, j), expected.read(i, j));
                    }
                }
            }
        }
    }

    #[test]
    fn matmul_overwrites_without_reading() {
        let a = Mat::from_fn(3, 2, |i, j| (i + j) as f32);
        let b = Mat::from_fn(2, 2, |i, j| (i * 2 + j) as f32);
        let mut c = Mat::from_fn(3, 2, |_, _| f32::NAN);
        matmul(c.as_mut(), a.as_ref(), Conj::No, b.as_ref(), Conj::No, None, 1.0);
        // [0 1; 1 2; 2 3] * [0 1; 2 3]
        assert!(c.as_slice() == &[2.0, 4.0, 6.0, 3.0, 7.0, 11.0]);

        let empty = Mat::<f32>::zeros(3, 0);
        let rhs = Mat::zeros(0, 2);
        matmul(c.as_mut(), empty.as_ref(), Conj::No, rhs.as_ref(), Conj::No, None, 1.0);
        assert!(c.as_slice() == &[0.0; 6]);
    }

    #[test]
    fn gerc_conjugates_rhs() {
        let x = Mat::from_fn(4, 1, |_, _| random_c64());
        let y = Mat::from_fn(3, 1, |_, _| random_c64());
        let a0 = Mat::from_fn(4, 3, |_, _| random_c64());
        let beta = random_c64();

        let mut a = a0.clone();
        gerc(a.as_mut(), x.as_ref(), y.as_ref(), beta);
        for j in 0..3 {
            for i in 0..4 {
                let expected = a0.read(i, j) + beta * x.read(i, 0) * y.read(j, 0).conj();
                assert_c64_close(a.read(i, j), expected);
            }
        }
    }

    #[test]
    fn trmv_ignores_lower_part() {
        let mut t = Mat::from_fn(3, 3, |i, j| (1 + i + 3 * j) as f64);
        t.write(2, 0, f64::NAN);
        let mut x = Mat::from_fn(3, 1, |i, _| (i + 1) as f64);
        trmv_upper(t.as_ref(), x.as_mut());
        // rows: [1 4 7; . 5 8; . . 9] * [1 2 3]
        assert_approx_eq!(x.read(0, 0), 30.0);
        assert_approx_eq!(x.read(1, 0), 34.0);
        assert_approx_eq!(x.read(2, 0), 27.0);
    }

    #[test]
    fn norm_is_robust() {
        let x = Mat::from_fn(2, 1, |i, _| if i == 0 { 3e200f64 } else { 4e200 });
        assert_approx_eq!(norm_l2(x.as_ref()) / 5e200, 1.0);

        let z = Mat::from_fn(1, 2, |_, j| c64::new(3.0 * j as f64, 4.0 * j as f64));
        assert_approx_eq!(norm_l2(z.as_ref()), 5.0);
        assert!(norm_l2(Mat::<f64>::zeros(0, 0).as_ref()) == 0.0);
    }

    #[test]
    fn axpy_on_row() {
        let mut a = Mat::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let x = Mat::from_fn(3, 1, |_, _| 1.0);
        axpy(a.as_mut().row_mut(1).transpose_mut(), x.as_ref(), 2.0);
        assert!(a.read(1, 0) == 5.0);
        assert!(a.read(1, 2) == 7.0);
        assert!(a.read(0, 0) == 0.0);
    }
}
